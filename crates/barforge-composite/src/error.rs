//! Composite construction errors.

use barforge_store::StoreError;
use thiserror::Error;

/// Invalid basket definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Two baskets share an id.
    #[error("Duplicate basket id '{0}'")]
    DuplicateId(String),

    /// Two baskets would write the same stored ticker.
    #[error("Duplicate basket ticker '{0}'")]
    DuplicateTicker(String),

    /// A basket lists a member more than once.
    #[error("Basket '{basket}' lists member '{member}' more than once")]
    DuplicateMember {
        /// Basket id.
        basket: String,
        /// Repeated member ticker.
        member: String,
    },

    /// A basket has no members.
    #[error("Basket '{0}' has no members")]
    EmptyBasket(String),

    /// A basket has a zero scale factor.
    #[error("Basket '{0}' has a zero scale factor")]
    ZeroScale(String),
}

/// Failures while building a basket's price panel.
#[derive(Error, Debug)]
pub enum PanelError {
    /// A member has no bar in the window and no fallback before it.
    ///
    /// The basket is skipped for the pass rather than averaged over fewer names.
    #[error("Basket '{basket}' is incomplete: no price for member '{member}'")]
    IncompleteBasket {
        /// Basket id.
        basket: String,
        /// Member without any price.
        member: String,
    },

    /// Reading constituent bars failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
