//! Progress notifications emitted while an estimator runs.
//!
//! Implement [`EstimatorListener`] to be called back with mutable access to
//! the estimator (every mutating call made from a callback fails with
//! [`crate::Error::Locked`]), or hand the estimator an
//! `mpsc::Sender<EstimationEvent>` / [`FnListener`] to consume the same events
//! as a stream.

use std::sync::mpsc::Sender;

/// The four kinds of notification an estimation produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimationEvent {
    Start,
    End,
    /// Emitted after every consensus iteration (zero based).
    NextIteration(usize),
    /// Emitted whenever progress in \[0, 1\] advanced by at least the
    /// configured progress delta.
    ProgressChange(f32),
}

/// Observer of an estimator of type `E`. Every method defaults to a no-op.
pub trait EstimatorListener<E: ?Sized> {
    fn on_estimate_start(&mut self, _estimator: &mut E) {}

    fn on_estimate_end(&mut self, _estimator: &mut E) {}

    fn on_estimate_next_iteration(&mut self, _estimator: &mut E, _iteration: usize) {}

    fn on_estimate_progress_change(&mut self, _estimator: &mut E, _progress: f32) {}
}

pub(crate) fn dispatch<E, L>(listener: &mut L, estimator: &mut E, event: EstimationEvent)
where
    E: ?Sized,
    L: EstimatorListener<E> + ?Sized,
{
    match event {
        EstimationEvent::Start => listener.on_estimate_start(estimator),
        EstimationEvent::End => listener.on_estimate_end(estimator),
        EstimationEvent::NextIteration(i) => listener.on_estimate_next_iteration(estimator, i),
        EstimationEvent::ProgressChange(p) => listener.on_estimate_progress_change(estimator, p),
    }
}

/// Forwards every event into a channel. A disconnected receiver is ignored.
impl<E: ?Sized> EstimatorListener<E> for Sender<EstimationEvent> {
    fn on_estimate_start(&mut self, _estimator: &mut E) {
        let _ = self.send(EstimationEvent::Start);
    }

    fn on_estimate_end(&mut self, _estimator: &mut E) {
        let _ = self.send(EstimationEvent::End);
    }

    fn on_estimate_next_iteration(&mut self, _estimator: &mut E, iteration: usize) {
        let _ = self.send(EstimationEvent::NextIteration(iteration));
    }

    fn on_estimate_progress_change(&mut self, _estimator: &mut E, progress: f32) {
        let _ = self.send(EstimationEvent::ProgressChange(progress));
    }
}

/// Adapts a closure over [`EstimationEvent`] into a listener.
pub struct FnListener<F>(pub F);

impl<E: ?Sized, F: FnMut(EstimationEvent)> EstimatorListener<E> for FnListener<F> {
    fn on_estimate_start(&mut self, _estimator: &mut E) {
        (self.0)(EstimationEvent::Start);
    }

    fn on_estimate_end(&mut self, _estimator: &mut E) {
        (self.0)(EstimationEvent::End);
    }

    fn on_estimate_next_iteration(&mut self, _estimator: &mut E, iteration: usize) {
        (self.0)(EstimationEvent::NextIteration(iteration));
    }

    fn on_estimate_progress_change(&mut self, _estimator: &mut E, progress: f32) {
        (self.0)(EstimationEvent::ProgressChange(progress));
    }
}
