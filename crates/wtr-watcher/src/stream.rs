use crate::Event;

use std::{
	pin::Pin,
	task::{Context, Poll},
};

use async_channel::Receiver;
use futures::Stream;
use pin_project_lite::pin_project;

pin_project! {
	/// Events of a [`Watch`](crate::Watch) opened with [`Watch::stream`](crate::Watch::stream).
	///
	/// Ends once the watch is closed and every buffered event has been consumed.
	#[derive(Debug)]
	pub struct EventStream {
		#[pin]
		rx: Receiver<Event>,
	}
}

impl EventStream {
	pub(crate) fn new(rx: Receiver<Event>) -> Self {
		Self { rx }
	}

	/// Next event, or `None` when the watch is closed and the buffer drained.
	pub async fn recv(&self) -> Option<Event> {
		self.rx.recv().await.ok()
	}

	/// Events buffered and not yet consumed.
	pub fn len(&self) -> usize {
		self.rx.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rx.is_empty()
	}
}

impl Stream for EventStream {
	type Item = Event;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.project().rx.poll_next(cx)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.rx.size_hint()
	}
}
