pub mod access;
pub mod accounts;
pub mod auth;
pub mod booking;
pub mod catalog;
pub mod vehicles;

#[cfg(test)]
pub(crate) mod test_support;
