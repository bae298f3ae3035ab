//! # Events Module
//!
//! Progress reporting for pipeline runs.
//!
//! ## Design
//! The executor and the stages emit events through a channel, so a
//! front end (the CLI spinner, a log forwarder) can follow a run
//! without the core knowing who listens.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = event_channel();
//!
//! // In a separate thread, listen for events
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Stage(StageEvent::Finished { stage, .. }) => println!("{stage} done"),
//!             Event::Item(ItemEvent::Failed { item, message, .. }) => println!("{item}: {message}"),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! // Run the pipeline with the sender
//! pipeline.run_with_events(items, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{event_channel, null_sender, EventReceiver, EventSender};
pub use types::*;
