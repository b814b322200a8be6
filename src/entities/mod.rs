//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod audit_log;
pub mod billing_contact;
pub mod closing_period;
pub mod patient;
pub mod product;
pub mod transaction;
pub mod transaction_item;
pub mod user;
pub mod ward;

// Re-export specific types to avoid conflicts
pub use audit_log::{Column as AuditLogColumn, Entity as AuditLog, Model as AuditLogModel};
pub use billing_contact::{
    Column as BillingContactColumn, Entity as BillingContact, Model as BillingContactModel,
};
pub use closing_period::{
    Column as ClosingPeriodColumn, Entity as ClosingPeriod, Model as ClosingPeriodModel,
};
pub use patient::{Column as PatientColumn, Entity as Patient, Model as PatientModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use transaction_item::{
    Column as TransactionItemColumn, Entity as TransactionItem, Model as TransactionItemModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use ward::{Column as WardColumn, Entity as Ward, Model as WardModel};
