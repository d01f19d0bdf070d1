//! Constituent directory.

use std::collections::{HashMap, HashSet};

use barforge_types::Timeframe;

use crate::{Basket, DirectoryError};

/// Validated, read-only set of basket definitions.
#[derive(Debug, Clone, Default)]
pub struct ConstituentDirectory {
    baskets: Vec<Basket>,
    by_id: HashMap<String, usize>,
}

impl ConstituentDirectory {
    /// Builds a directory, rejecting inconsistent definitions.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] for duplicate ids or tickers, duplicate
    /// members, empty baskets or a zero scale on a non-normalized basket.
    pub fn new(baskets: Vec<Basket>) -> Result<Self, DirectoryError> {
        let mut by_id = HashMap::with_capacity(baskets.len());
        let mut tickers = HashSet::with_capacity(baskets.len());

        for (idx, basket) in baskets.iter().enumerate() {
            if by_id.insert(basket.id.clone(), idx).is_some() {
                return Err(DirectoryError::DuplicateId(basket.id.clone()));
            }
            if !tickers.insert(basket.ticker.as_str()) {
                return Err(DirectoryError::DuplicateTicker(basket.ticker.clone()));
            }
            if basket.is_empty() {
                return Err(DirectoryError::EmptyBasket(basket.id.clone()));
            }
            if basket.scale == 0 && !basket.normalized {
                return Err(DirectoryError::ZeroScale(basket.id.clone()));
            }
            let mut seen = HashSet::with_capacity(basket.len());
            if let Some(dup) = basket.members.iter().find(|m| !seen.insert(m.as_str())) {
                return Err(DirectoryError::DuplicateMember {
                    basket: basket.id.clone(),
                    member: dup.clone(),
                });
            }
        }

        Ok(Self { baskets, by_id })
    }

    /// Looks up a basket by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Basket> {
        self.by_id.get(id).map(|&idx| &self.baskets[idx])
    }

    /// Returns the ordered members of a basket.
    #[must_use]
    pub fn members(&self, id: &str) -> Option<&[String]> {
        self.get(id).map(|b| b.members.as_slice())
    }

    /// Returns all baskets in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Basket> {
        self.baskets.iter()
    }

    /// Returns the baskets built at `timeframe`.
    pub fn for_timeframe(&self, timeframe: Timeframe) -> impl Iterator<Item = &Basket> {
        self.baskets.iter().filter(move |b| b.applies_to(timeframe))
    }

    /// Returns the number of baskets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.baskets.len()
    }

    /// Returns true if no baskets are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.baskets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn egx() -> Vec<Basket> {
        vec![
            Basket::new("egx30", "EGX30LASTEWI", ["COMI", "ETEL", "HRHO"]),
            Basket::new("shariah", "EGX34SHARIAHLASTEWI", ["ETEL", "SWDY"]).normalized(),
        ]
    }

    #[test]
    fn test_members_lookup() {
        let dir = ConstituentDirectory::new(egx()).unwrap();
        assert_eq!(dir.len(), 2);
        assert_eq!(
            dir.members("egx30").unwrap(),
            &["COMI".to_string(), "ETEL".to_string(), "HRHO".to_string()]
        );
        assert!(dir.members("egx70").is_none());
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut baskets = egx();
        baskets.push(Basket::new("egx30", "OTHER", ["COMI"]));
        assert_eq!(
            ConstituentDirectory::new(baskets).unwrap_err(),
            DirectoryError::DuplicateId("egx30".to_string())
        );

        let mut baskets = egx();
        baskets.push(Basket::new("other", "EGX30LASTEWI", ["COMI"]));
        assert!(matches!(
            ConstituentDirectory::new(baskets),
            Err(DirectoryError::DuplicateTicker(_))
        ));

        let baskets = vec![Basket::new("dup", "DUP", ["COMI", "COMI"])];
        assert!(matches!(
            ConstituentDirectory::new(baskets),
            Err(DirectoryError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_and_zero_scale() {
        let empty = vec![Basket::new("e", "E", Vec::<String>::new())];
        assert!(matches!(
            ConstituentDirectory::new(empty),
            Err(DirectoryError::EmptyBasket(_))
        ));

        let zero = vec![Basket::new("z", "Z", ["COMI"]).with_scale(0)];
        assert!(matches!(
            ConstituentDirectory::new(zero),
            Err(DirectoryError::ZeroScale(_))
        ));
    }

    #[test]
    fn test_for_timeframe() {
        let mut baskets = egx();
        baskets[1].timeframes = vec![Timeframe::Minute5];
        let dir = ConstituentDirectory::new(baskets).unwrap();
        assert_eq!(dir.for_timeframe(Timeframe::Minute1).count(), 1);
        assert_eq!(dir.for_timeframe(Timeframe::Minute5).count(), 2);
    }
}
