pub(crate) mod login;
pub(crate) mod repos;
pub(crate) mod shared;
pub(crate) mod show;
pub(crate) mod star;
