//! Turn SIGINT/SIGTERM into cancellation.
//!
//! The handler only flips a flag; a watcher thread cancels the token so the
//! engine runner can kill the engine's process group and return. After the
//! first signal the default disposition is restored, so a second Ctrl-C
//! terminates immediately.

use declarative::CancelToken;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

static RECEIVED: AtomicBool = AtomicBool::new(false);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    RECEIVED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn set_handlers(handler: libc::sighandler_t) {
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

/// Cancel `token` on the first SIGINT or SIGTERM.
pub fn cancel_on_signal(token: CancelToken) {
    #[cfg(unix)]
    set_handlers(on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t);

    thread::spawn(move || {
        while !RECEIVED.load(Ordering::SeqCst) {
            thread::sleep(POLL_INTERVAL);
        }
        log::warn!("Interrupted, stopping running engine processes");
        token.cancel();
        #[cfg(unix)]
        set_handlers(libc::SIG_DFL);
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_sigterm_cancels_token() {
        let token = CancelToken::new();
        cancel_on_signal(token.clone());

        // SAFETY: the handler installed above catches the signal
        unsafe { libc::raise(libc::SIGTERM) };

        let start = Instant::now();
        while !token.is_cancelled() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(token.is_cancelled());
    }
}
