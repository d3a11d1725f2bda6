pub mod account;

pub use account::{Account, AccountResponse, AccountRow, NewAccount, PendingVerification};
