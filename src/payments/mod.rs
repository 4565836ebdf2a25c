mod stripe;

pub use stripe::*;

/// Kind of purchase a checkout session is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Credits,
    Subscription,
    Enterprise,
}

impl std::str::FromStr for ProductKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credits" => Ok(ProductKind::Credits),
            "subscription" => Ok(ProductKind::Subscription),
            "enterprise" => Ok(ProductKind::Enterprise),
            _ => Err(()),
        }
    }
}
