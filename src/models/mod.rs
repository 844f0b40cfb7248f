pub mod account;
pub mod forms;
pub mod gmc;
pub mod history;
pub mod local_office_contact;
pub mod ltft;
pub mod notification_type;
pub mod placement;
pub mod planned;
pub mod prelude;
pub mod programme_membership;
pub mod schedule_entry;
