pub mod account;
pub mod b2b;
pub mod health;
pub mod keys;
pub mod transfer;

pub use account::{bank_info, get_account, list_accounts, open_account};
pub use b2b::receive_incoming;
pub use health::health_check;
pub use keys::get_key_set;
pub use transfer::{
    create_external_transfer, create_internal_transfer, create_transfer, get_transfer,
    list_transfers,
};
