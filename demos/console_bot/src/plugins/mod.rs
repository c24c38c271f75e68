//! Plugins compiled into the console bot.
//!
//! Each one registers itself in the plugin catalog; a manifest with the same
//! name in the plugin directory switches it on.
//!
//! | plugin | events | priority |
//! |--------|--------|----------|
//! | guard | message_received | 100 |
//! | admin | ready, message_received, shutdown | 50 |
//! | weather | message_received | 10 |
//! | echo | message_received | 0 |
//! | errors | error | 0 |

mod admin;
mod echo;
mod errors;
mod guard;
mod weather;

use hearth::core::Invocation;

/// Reads the command the guard extracted, if any.
fn command(inv: &Invocation) -> Option<&str> {
    inv.kwarg_str("command")
}

/// Channel the event came from, defaulting to the console.
fn channel(inv: &Invocation) -> &str {
    inv.kwarg_str("channel").unwrap_or(crate::console::CHANNEL)
}
