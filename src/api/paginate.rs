//! Cursor-driven listing over JSON:API style envelopes.
//!
//! List endpoints answer with `{"data": [...], "meta": {"paging": {"nextCursor": "..."}}}`.
//! [`Paginator::list_all`] requests the first page without a cursor, yields its items in server
//! order, and follows `nextCursor` until it disappears or the caller's limit is reached. When the
//! limit lands mid-page the page is truncated and no further request is made.

// crates.io
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	api::{RequestExecutor, RequestSpec},
	http::{ReqwestHttpClient, TokenHttpClient},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// One decoded page of a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
	/// Items in server order.
	pub items: Vec<T>,
	/// Opaque continuation cursor; `None` on the last page.
	pub next_cursor: Option<String>,
}
impl<T> Page<T> {
	/// Returns `true` if no further page exists.
	pub fn is_last(&self) -> bool {
		self.next_cursor.is_none()
	}

	fn from_envelope(envelope: Envelope<T>) -> Self {
		let next_cursor = envelope
			.meta
			.and_then(|meta| meta.paging)
			.and_then(|paging| paging.next_cursor)
			.or(envelope.next_cursor)
			.filter(|cursor| !cursor.is_empty());

		Self { items: envelope.data, next_cursor }
	}
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
	#[serde(default = "Vec::new")]
	data: Vec<T>,
	#[serde(default)]
	meta: Option<Meta>,
	#[serde(default, rename = "nextCursor")]
	next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Meta {
	#[serde(default)]
	paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
	#[serde(default, rename = "nextCursor")]
	next_cursor: Option<String>,
}

/// Drives a [`RequestExecutor`] across the pages of list endpoints.
pub struct Paginator<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	executor: Arc<RequestExecutor<C>>,
}
impl<C> Paginator<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Wraps the executor used for every page request.
	pub fn new(executor: Arc<RequestExecutor<C>>) -> Self {
		Self { executor }
	}

	/// Requests the page of `template` starting at `cursor`.
	pub async fn fetch_page<T>(
		&self,
		template: &RequestSpec,
		cursor: Option<&str>,
	) -> Result<Page<T>>
	where
		T: DeserializeOwned,
	{
		let spec = template.with_cursor(cursor);
		let span = OpSpan::new(OpKind::Paginate, "fetch_page");
		let envelope = span.instrument(self.executor.send_json::<Envelope<T>>(&spec)).await?;

		Ok(Page::from_envelope(envelope))
	}

	/// Lazily yields every item of the listing, stopping after `limit` items when given.
	///
	/// The stream is forward-only. An error is yielded once and ends the stream.
	pub fn list_all<'a, T>(
		&'a self,
		template: &'a RequestSpec,
		limit: Option<usize>,
	) -> impl Stream<Item = Result<T>> + 'a
	where
		T: 'a + DeserializeOwned,
	{
		async_stream::stream! {
			if limit == Some(0) {
				return;
			}

			obs::record_op_outcome(OpKind::Paginate, OpOutcome::Attempt);

			let mut cursor = None::<String>;
			let mut yielded = 0_usize;

			loop {
				let page = match self.fetch_page::<T>(template, cursor.as_deref()).await {
					Ok(page) => page,
					Err(err) => {
						obs::record_op_outcome(OpKind::Paginate, OpOutcome::Failure);

						yield Err(err);

						return;
					},
				};

				for item in page.items {
					yield Ok(item);

					yielded += 1;

					if limit.is_some_and(|max| yielded >= max) {
						obs::record_op_outcome(OpKind::Paginate, OpOutcome::Success);

						return;
					}
				}

				match page.next_cursor {
					Some(next) => cursor = Some(next),
					None => {
						obs::record_op_outcome(OpKind::Paginate, OpOutcome::Success);

						return;
					},
				}
			}
		}
	}

	/// Drains [`Paginator::list_all`] into a vector.
	pub async fn collect_all<T>(
		&self,
		template: &RequestSpec,
		limit: Option<usize>,
	) -> Result<Vec<T>>
	where
		T: DeserializeOwned,
	{
		let stream = self.list_all::<T>(template, limit);

		futures::pin_mut!(stream);

		let mut items = Vec::new();

		while let Some(item) = stream.next().await {
			items.push(item?);
		}

		Ok(items)
	}
}
impl<C> Debug for Paginator<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Paginator").field("executor", &self.executor).finish()
	}
}
