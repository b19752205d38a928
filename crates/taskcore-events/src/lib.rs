//! The Interrupt Controller (§4.D): the single demultiplexing point for
//! every external event, whether a push-event-stream message or an
//! HTTP response routed back through it.
//!
//! Grounded on the teacher's `riptide-events::bus::EventBus` sequential
//! dispatch path (`async_handlers: false`, `continue_on_handler_error:
//! true`): handlers run one after another, and a handler's failure is
//! logged and swallowed rather than aborting dispatch. Unlike the
//! teacher's bus, dispatch here is not buffered through a broadcast
//! channel — `dispatch` is called directly by whoever received the event
//! (the push-event adapter, or the pipeline's RES stage), since this
//! controller's job is demultiplexing and dedup, not queuing.

mod controller;
mod event;

pub use controller::InterruptController;
pub use event::EventHandler;
