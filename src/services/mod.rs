pub mod account_service;
pub use account_service::{AccountError, AccountService};

pub mod account_service_impl;
pub use account_service_impl::SeaOrmAccountService;

pub mod credentials;
pub mod notifier;
pub mod suspension;

pub use notifier::{LogNotifier, MemoryNotifier, Message, Notifier, WebhookNotifier};
