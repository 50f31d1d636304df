/// Key that submits the input field.
pub const SUBMIT_KEY: &str = "Enter";

/// Single-line text input the user types into.
pub trait InputField {
    fn value(&self) -> String;
    fn clear(&self);
}

pub fn is_submit_key(key: &str) -> bool {
    key == SUBMIT_KEY
}
