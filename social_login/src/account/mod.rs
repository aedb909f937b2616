mod errors;
mod resolver;
mod types;

pub use errors::AccountError;
pub use resolver::AccountFieldResolver;
pub use types::Account;
