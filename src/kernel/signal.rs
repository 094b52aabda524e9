/// Async-safe interrupt handling for the orchestrator
///
/// The handler only flips atomics. Stage waits poll the flag, kill their child
/// group and return `ScopeError::Interrupted`, leaving the flag set so callers
/// further up still observe the interruption.
use log::info;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Process-wide interrupt flag shared with every default stage runner
static INTERRUPT_REQUESTED: Lazy<Arc<AtomicBool>> = Lazy::new(|| Arc::new(AtomicBool::new(false)));

/// Last signal received (0 if none)
static SIGNAL_RECEIVED: AtomicU32 = AtomicU32::new(0);

/// Handle to the process-wide flag
pub fn global_interrupt_flag() -> Arc<AtomicBool> {
    Arc::clone(&INTERRUPT_REQUESTED)
}

/// Install SIGINT/SIGTERM handlers that raise the process-wide flag.
///
/// Call early in main, before worker threads are spawned.
pub fn install_interrupt_handlers() -> Result<(), String> {
    // force initialization outside the handler
    Lazy::force(&INTERRUPT_REQUESTED);

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    unsafe {
        signal::sigaction(Signal::SIGINT, &action)
            .map_err(|e| format!("Failed to install SIGINT handler: {}", e))?;
        signal::sigaction(Signal::SIGTERM, &action)
            .map_err(|e| format!("Failed to install SIGTERM handler: {}", e))?;
    }

    info!("Interrupt handlers installed (SIGINT, SIGTERM)");
    Ok(())
}

extern "C" fn on_signal(sig: libc::c_int) {
    SIGNAL_RECEIVED.store(sig as u32, Ordering::SeqCst);
    INTERRUPT_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn interrupt_requested() -> bool {
    INTERRUPT_REQUESTED.load(Ordering::SeqCst)
}

/// Raise the process-wide flag without a signal
pub fn request_interrupt() {
    INTERRUPT_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn received_signal() -> u32 {
    SIGNAL_RECEIVED.load(Ordering::SeqCst)
}
