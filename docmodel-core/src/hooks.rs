//! Document middleware: pre and post hooks around model lifecycle events.
//!
//! A pre hook receives the [`DocumentContext`] of the document being processed and a
//! [`Next`] continuation. The pipeline is suspended until the hook calls
//! [`Next::proceed`]; calling [`Next::fail`] aborts the operation with the given
//! message, and dropping the continuation aborts it with
//! [`ModelError::HookAborted`](crate::error::ModelError::HookAborted).
//!
//! Post hooks run after the operation has completed and receive the stored document.
//!
//! ```ignore
//! use docmodel::hooks::{pre_hook, HookEvent};
//!
//! schema.pre(HookEvent::Save, pre_hook(|doc, next| async move {
//!     if let Some(email) = doc.get_str("email") {
//!         doc.set("email", email.to_lowercase());
//!     }
//!     next.proceed();
//! }));
//! ```

use bson::{Bson, Document};
use futures::{channel::oneshot, future::BoxFuture};
use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::warn;

use crate::error::{ModelError, ModelResult};

/// Lifecycle events a hook can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Fired around inserting a new document or persisting changes to an existing one.
    Save,
    /// Fired around deleting a document.
    Remove,
    /// Fired after documents are loaded by `find`, `find_one` and `find_by_id`, once per
    /// document. Loading has no document to hand to a pre hook, so only post hooks run.
    Find,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::Save => "save",
            HookEvent::Remove => "remove",
            HookEvent::Find => "find",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler registered with [`Schema::pre`](crate::schema::Schema::pre).
pub type PreHook = Arc<dyn Fn(DocumentContext, Next) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handler registered with [`Schema::post`](crate::schema::Schema::post).
pub type PostHook = Arc<dyn Fn(Document) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`PreHook`].
pub fn pre_hook<F, Fut>(handler: F) -> PreHook
where
    F: Fn(DocumentContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx, next| Box::pin(handler(ctx, next)))
}

/// Wraps an async closure into a [`PostHook`].
pub fn post_hook<F, Fut>(handler: F) -> PostHook
where
    F: Fn(Document) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |doc| Box::pin(handler(doc)))
}

/// Shared view of the document a pre hook runs against.
///
/// Clones share the same document, so changes made by a hook are visible to the
/// following hooks and to the operation itself.
#[derive(Clone)]
pub struct DocumentContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    collection: String,
    is_new: bool,
    document: Mutex<Document>,
}

impl DocumentContext {
    pub(crate) fn new(collection: &str, document: Document, is_new: bool) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                collection: collection.to_string(),
                is_new,
                document: Mutex::new(document),
            }),
        }
    }

    /// Name of the collection the document belongs to.
    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    /// `true` when the document has never been stored.
    pub fn is_new(&self) -> bool {
        self.inner.is_new
    }

    pub fn get(&self, field: &str) -> Option<Bson> {
        self.lock().get(field).cloned()
    }

    pub fn get_str(&self, field: &str) -> Option<String> {
        self.lock()
            .get_str(field)
            .ok()
            .map(str::to_string)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.lock().contains_key(field)
    }

    pub fn set(&self, field: &str, value: impl Into<Bson>) {
        self.lock().insert(field, value.into());
    }

    pub fn remove(&self, field: &str) -> Option<Bson> {
        self.lock().remove(field)
    }

    /// Copy of the document in its current state.
    pub fn snapshot(&self) -> Document {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Document> {
        self.inner
            .document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentContext")
            .field("collection", &self.inner.collection)
            .field("is_new", &self.inner.is_new)
            .field("document", &*self.lock())
            .finish()
    }
}

/// Continuation handed to a pre hook.
#[derive(Debug)]
pub struct Next {
    event: HookEvent,
    tx: oneshot::Sender<ModelResult<()>>,
}

impl Next {
    /// Resumes the pipeline.
    pub fn proceed(self) {
        let _ = self.tx.send(Ok(()));
    }

    /// Aborts the pipeline; the operation fails with [`ModelError::Hook`].
    pub fn fail(self, message: impl Into<String>) {
        let event = self.event;
        let _ = self.tx.send(Err(ModelError::Hook { event, message: message.into() }));
    }

    /// Aborts the pipeline with `err`, returned unchanged to the caller.
    pub fn fail_with(self, err: ModelError) {
        let _ = self.tx.send(Err(err));
    }
}

/// Runs `hooks` in order, waiting for each continuation before starting the next hook.
pub(crate) async fn run_pre_hooks(
    event: HookEvent,
    hooks: &[PreHook],
    ctx: &DocumentContext,
) -> ModelResult<()> {
    for hook in hooks {
        let (tx, rx) = oneshot::channel();

        hook(ctx.clone(), Next { event, tx }).await;

        match rx.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                warn!(%event, collection = ctx.collection(), "pre hook dropped its continuation");
                return Err(ModelError::HookAborted { event });
            }
        }
    }

    Ok(())
}

pub(crate) async fn run_post_hooks(hooks: &[PostHook], document: &Document) {
    for hook in hooks {
        hook(document.clone()).await;
    }
}
