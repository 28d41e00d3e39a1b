//! Model handles and the documents they produce.
//!
//! A [`Model`] is a schema compiled against a connection under a collection name. It
//! exposes the create/read/update/delete operations of that collection, running the
//! schema's hooks around writes. Every operation is an `async fn`; [`CallbackExt`]
//! turns any of them into a callback style call without duplicating logic.
//!
//! ```ignore
//! let users = factory.build(config).await?;
//!
//! let mut alice = users.create(doc! { "name": "Alice" }).await?;
//! alice.set("name", "Alice Liddell");
//! alice.save().await?;
//!
//! let found = users.find(Filter::eq("name", "Alice Liddell").into()).await?;
//! ```

use bson::{Bson, DateTime, Document, Uuid};
use futures::{FutureExt, future::Map};
use std::{fmt, future::Future, sync::Arc};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    connection::Connection,
    error::{DocumentStoreError, ModelError, ModelResult},
    hooks::{DocumentContext, HookEvent, run_post_hooks, run_pre_hooks},
    query::Query,
    schema::Schema,
};

/// Name of the identity field.
pub const ID_FIELD: &str = "_id";

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

/// A schema bound to a collection on a connection.
///
/// Cloning is cheap; clones share the schema and connection.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    name: String,
    schema: Arc<Schema>,
    connection: Connection,
}

impl Model {
    pub(crate) fn new(name: String, schema: Arc<Schema>, connection: Connection) -> Self {
        Self { inner: Arc::new(ModelInner { name, schema, connection }) }
    }

    /// Collection name the model is bound to.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    fn backend(&self) -> &dyn StoreBackend {
        self.inner.connection.backend()
    }

    /// Wraps `document` into an unsaved instance.
    pub fn new_instance(&self, document: Document) -> Instance {
        Instance { model: self.clone(), document, is_new: true }
    }

    fn stored_instance(&self, document: Document) -> Instance {
        Instance { model: self.clone(), document, is_new: false }
    }

    /// Creates and saves a new document.
    pub async fn create(&self, document: Document) -> ModelResult<Instance> {
        let mut instance = self.new_instance(document);
        self.save(&mut instance).await?;

        Ok(instance)
    }

    /// Inserts a new instance or persists changes to a stored one.
    ///
    /// Pre-save hooks run first and may modify the document; an instance without an
    /// `_id` after the hooks gets a fresh UUID.
    pub async fn save(&self, instance: &mut Instance) -> ModelResult<()> {
        let schema = self.schema();
        let ctx = DocumentContext::new(self.name(), instance.document.clone(), instance.is_new);

        run_pre_hooks(HookEvent::Save, &schema.pre_hooks(HookEvent::Save), &ctx).await?;

        let mut document = ctx.snapshot();

        if schema.options().timestamps {
            let now = DateTime::now();

            if instance.is_new && !document.contains_key(CREATED_AT) {
                document.insert(CREATED_AT, now);
            }
            document.insert(UPDATED_AT, now);
        }

        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::from(Uuid::new());
                document.insert(ID_FIELD, id.clone());
                id
            }
        };

        if instance.is_new {
            self.backend()
                .insert_documents(vec![(id.clone(), document.clone())], self.name())
                .await?;
        } else {
            self.backend()
                .update_documents(vec![(id.clone(), document.clone())], self.name())
                .await?;
        }

        debug!(model = self.name(), %id, inserted = instance.is_new, "document saved");

        instance.document = document;
        instance.is_new = false;

        run_post_hooks(&schema.post_hooks(HookEvent::Save), &instance.document).await;

        Ok(())
    }

    /// Wraps loaded documents into instances, running the post-find hooks on each.
    async fn loaded(&self, documents: Vec<Document>) -> Vec<Instance> {
        let hooks = self.schema().post_hooks(HookEvent::Find);

        for document in &documents {
            run_post_hooks(&hooks, document).await;
        }

        documents
            .into_iter()
            .map(|doc| self.stored_instance(doc))
            .collect()
    }

    /// Returns the documents matching `query`.
    pub async fn find(&self, query: Query) -> ModelResult<Vec<Instance>> {
        let documents = self
            .backend()
            .query_documents(query, self.name())
            .await?;

        Ok(self.loaded(documents).await)
    }

    /// Returns the first document matching `query`.
    pub async fn find_one(&self, query: Query) -> ModelResult<Option<Instance>> {
        let query = Query { limit: Some(1), ..query };

        Ok(self.find(query).await?.into_iter().next())
    }

    pub async fn find_by_id(&self, id: impl Into<Bson>) -> ModelResult<Option<Instance>> {
        let documents = self
            .backend()
            .get_documents(vec![id.into()], self.name())
            .await?;

        Ok(self.loaded(documents).await.into_iter().next())
    }

    /// Number of documents matching `query`.
    pub async fn count(&self, query: Query) -> ModelResult<usize> {
        Ok(self
            .backend()
            .query_documents(query, self.name())
            .await?
            .len())
    }

    /// Deletes a stored instance, running the remove hooks around it.
    pub async fn remove(&self, instance: &Instance) -> ModelResult<()> {
        let schema = self.schema();
        let id = instance
            .id()
            .cloned()
            .ok_or_else(|| DocumentStoreError::InvalidDocument(format!(
                "document in {} has no {}",
                self.name(),
                ID_FIELD
            )))?;
        let ctx = DocumentContext::new(self.name(), instance.document.clone(), instance.is_new);

        run_pre_hooks(HookEvent::Remove, &schema.pre_hooks(HookEvent::Remove), &ctx).await?;

        self.backend()
            .delete_documents(vec![id.clone()], self.name())
            .await?;

        debug!(model = self.name(), %id, "document removed");

        run_post_hooks(&schema.post_hooks(HookEvent::Remove), &instance.document).await;

        Ok(())
    }

    /// Looks up and removes the document with `id`. Returns `false` if there was none.
    pub async fn delete_by_id(&self, id: impl Into<Bson>) -> ModelResult<bool> {
        match self.find_by_id(id).await? {
            Some(instance) => {
                self.remove(&instance).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Creates the schema's indexes in the backend.
    ///
    /// [`Connection::model`] already does this when the model is built; call it again
    /// after the backend lost its indexes (a dropped collection, for instance).
    pub async fn ensure_indexes(&self) -> ModelResult<()> {
        for index in self.schema().indexes() {
            self.backend()
                .create_index(
                    self.name(),
                    index.keys.clone(),
                    index.options.clone().unwrap_or_default(),
                )
                .await?;
        }

        Ok(())
    }

    /// Calls the static registered under `name`.
    pub async fn call_static(&self, name: &str, args: Vec<Bson>) -> ModelResult<Bson> {
        let method = self
            .schema()
            .statics()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::StaticNotFound(name.to_string()))?;

        method(self.clone(), args).await
    }

    /// Value the autoincrement counter will assign to the next new document.
    pub async fn next_count(&self) -> ModelResult<i64> {
        let counter = self
            .schema()
            .counter()
            .ok_or_else(|| ModelError::CounterNotConfigured(self.name().to_string()))?;

        Ok(match self.backend().current_counter(&counter.key).await? {
            Some(current) => counter.next_after(current)?,
            None => counter.start_at,
        })
    }

    /// Restarts the autoincrement counter; the next new document receives `start_at`.
    pub async fn reset_count(&self) -> ModelResult<i64> {
        let counter = self
            .schema()
            .counter()
            .ok_or_else(|| ModelError::CounterNotConfigured(self.name().to_string()))?;

        self.backend()
            .reset_counter(&counter.key, counter.seed_value()?)
            .await?;

        Ok(counter.start_at)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("connection", &self.inner.connection.name())
            .field("schema", &self.inner.schema)
            .finish()
    }
}

/// A document bound to its model.
#[derive(Clone)]
pub struct Instance {
    model: Model,
    document: Document,
    is_new: bool,
}

impl Instance {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn id(&self) -> Option<&Bson> {
        self.document.get(ID_FIELD)
    }

    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.document.get(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Bson>) {
        self.document.insert(field, value.into());
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// `true` until the instance has been saved once.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Calls the instance method registered under `name`.
    pub fn call(&self, name: &str, args: Vec<Bson>) -> ModelResult<Bson> {
        let method = self
            .model
            .schema()
            .methods()
            .get(name)
            .ok_or_else(|| ModelError::MethodNotFound(name.to_string()))?;

        method(self, args)
    }

    /// Plain copy of the document, passed through the schema's `toObject` transform.
    pub fn to_object(&self) -> Document {
        let transform = self
            .model
            .schema()
            .options()
            .to_object
            .as_ref()
            .and_then(|options| options.transform.as_ref());

        match transform {
            Some(transform) => transform(&self.document, self.document.clone()),
            None => self.document.clone(),
        }
    }

    pub async fn save(&mut self) -> ModelResult<()> {
        let model = self.model.clone();
        model.save(self).await
    }

    pub async fn remove(&self) -> ModelResult<()> {
        self.model.remove(self).await
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("model", &self.model.name())
            .field("document", &self.document)
            .field("is_new", &self.is_new)
            .finish()
    }
}

/// Callback style adapter for model operations.
///
/// Any operation future can be completed through a callback instead of being awaited
/// for its value:
///
/// ```ignore
/// users
///     .find_by_id(7)
///     .callback(|result| match result {
///         Ok(Some(user)) => println!("found {:?}", user.document()),
///         Ok(None) => println!("no such user"),
///         Err(err) => eprintln!("lookup failed: {err}"),
///     })
///     .await;
/// ```
pub trait CallbackExt: Future + Sized {
    fn callback<F>(self, callback: F) -> Map<Self, F>
    where
        F: FnOnce(Self::Output),
    {
        self.map(callback)
    }
}

impl<T: Future> CallbackExt for T {}
