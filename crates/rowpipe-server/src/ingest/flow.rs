//! Backpressure state machine
//!
//! The controller owns the row buffer and never holds more than one batch. The pipeline only
//! polls the decoder while the controller is `Idle`, so a batch in flight suspends decoding
//! until [`FlowController::batch_done`] is called.
//!
//! ```text
//!  Idle --push (full)--> BatchInFlight --batch_done--> Idle
//!  Idle --end_of_stream--> Draining --next_drain_batch (empty)--> Finished
//!  any non-terminal --fail--> Failed
//! ```

use crate::error::FlowError;

/// State of the row flow for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Accepting rows from the decoder
    Idle,
    /// A full batch was handed out; decoding is suspended
    BatchInFlight,
    /// The stream ended; buffered rows are handed out in chunks
    Draining,
    Finished,
    Failed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Finished | FlowState::Failed)
    }
}

#[derive(Debug)]
pub struct FlowController<T> {
    state: FlowState,
    buffer: Vec<T>,
    batch_size: usize,
}

impl<T> FlowController<T> {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            state: FlowState::Idle,
            buffer: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer a decoded row, cutting a batch once the buffer is full
    pub fn push(&mut self, row: T) -> Result<Option<Vec<T>>, FlowError> {
        self.require(FlowState::Idle, "accept a row")?;

        self.buffer.push(row);
        if self.buffer.len() < self.batch_size {
            return Ok(None);
        }

        self.state = FlowState::BatchInFlight;
        Ok(Some(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(self.batch_size),
        )))
    }

    /// The in-flight batch was processed; decoding may resume
    pub fn batch_done(&mut self) -> Result<(), FlowError> {
        self.require(FlowState::BatchInFlight, "finish a batch")?;
        self.state = FlowState::Idle;
        Ok(())
    }

    /// The decoder reported end-of-stream
    pub fn end_of_stream(&mut self) -> Result<(), FlowError> {
        self.require(FlowState::Idle, "end the stream")?;
        self.state = FlowState::Draining;
        Ok(())
    }

    /// Next chunk of leftover rows, or `None` once drained
    pub fn next_drain_batch(&mut self) -> Result<Option<Vec<T>>, FlowError> {
        self.require(FlowState::Draining, "drain")?;

        if self.buffer.is_empty() {
            self.state = FlowState::Finished;
            return Ok(None);
        }

        let take = self.buffer.len().min(self.batch_size);
        Ok(Some(self.buffer.drain(..take).collect()))
    }

    /// Stop the flow and discard whatever is buffered
    pub fn fail(&mut self) -> Result<(), FlowError> {
        if self.state.is_terminal() {
            return Err(FlowError {
                state: self.state,
                action: "fail",
            });
        }
        self.buffer.clear();
        self.state = FlowState::Failed;
        Ok(())
    }

    fn require(&self, wanted: FlowState, action: &'static str) -> Result<(), FlowError> {
        if self.state == wanted {
            Ok(())
        } else {
            Err(FlowError {
                state: self.state,
                action,
            })
        }
    }
}
