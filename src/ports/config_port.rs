//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    /// All keys present in a section, sorted. Used to enumerate the
    /// `[instruments]` mapping.
    fn keys_in(&self, section: &str) -> Vec<String>;
}
