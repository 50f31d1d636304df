/// Blocking, user-visible notification channel (a browser `alert`, stderr, ...).
pub trait Notifier {
    fn notify_failure(&self, message: &str);
}
