use tracing::debug;

use crate::state::ChannelState;

/// Decide whether a non-command message should get a generated reply.
///
/// `draw(n)` must return a value uniformly distributed in `0..n`; it is only
/// called when the outcome actually depends on chance.
pub fn should_reply<D>(text: &str, state: &ChannelState, trigger: &str, draw: D) -> bool
where
    D: FnOnce(u32) -> u32,
{
    if state.silenced {
        return false;
    }
    if text.contains(trigger) {
        return true;
    }
    match state.frequency {
        0 => false,
        1 => true,
        n => {
            let roll = draw(n);
            debug!(channel = %state.channel(), roll, frequency = n, "reply roll");
            roll == 0
        }
    }
}

/// Production draw: thread-local CSPRNG.
pub fn thread_draw(sides: u32) -> u32 {
    use rand::Rng;
    rand::thread_rng().gen_range(0..sides)
}
