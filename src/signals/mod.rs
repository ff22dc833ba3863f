/*!
 * Signals Module
 * SIGALRM timeouts and the cancellation token they feed
 */

mod alarm;
mod token;

// Re-export public API
pub use alarm::AlarmTimer;
pub use token::CancellationToken;
