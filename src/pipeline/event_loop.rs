//! Event loop: the only place the pipeline state lives. Events from workers and operator input
//! are applied one at a time through the router; the tasks it returns go to the executor.

use anyhow::Result;
use crossbeam_channel::{Receiver, never, select};
use log::{debug, info};

use crate::engine::{Event, Pipeline, dispatch};
use crate::ui::{Action, Frontend, Input};
use crate::utils::config::UiConsts;

use super::executor::Executor;

/// Apply one event and submit the follow-up tasks.
pub fn apply(pipeline: Pipeline, event: Event, executor: &Executor) -> Pipeline {
    let (pipeline, tasks) = dispatch(pipeline, event);
    for task in tasks {
        executor.submit(task);
    }
    pipeline
}

/// Run until the frontend asks to quit. Returns the final state.
///
/// Renders after every handled message and at least once per [`UiConsts::TICK`].
pub fn run_event_loop(
    mut pipeline: Pipeline,
    executor: &Executor,
    event_rx: &Receiver<Event>,
    input_rx: Receiver<Input>,
    frontend: &mut dyn Frontend,
) -> Result<Pipeline> {
    let quiet_events = never::<Event>();
    let quiet_input = never::<Input>();
    let mut events_open = true;
    let mut input_open = true;
    loop {
        frontend.render(&pipeline)?;
        if let Some(action) = frontend.poll(&pipeline) {
            match action {
                Action::Dispatch(event) => {
                    pipeline = apply(pipeline, event, executor);
                    continue;
                }
                Action::Quit => break,
            }
        }

        let events = if events_open { event_rx } else { &quiet_events };
        let inputs = if input_open { &input_rx } else { &quiet_input };
        let mut quit = false;
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => pipeline = apply(pipeline, event, executor),
                Err(_) => {
                    debug!("Event channel closed");
                    events_open = false;
                }
            },
            recv(inputs) -> msg => match msg {
                Ok(input) => match frontend.on_input(input, &pipeline) {
                    Some(Action::Dispatch(event)) => pipeline = apply(pipeline, event, executor),
                    Some(Action::Quit) => quit = true,
                    None => {}
                },
                Err(_) => input_open = false,
            },
            default(UiConsts::TICK) => {}
        }
        if quit {
            break;
        }
    }
    info!("Event loop stopped");
    Ok(pipeline)
}
