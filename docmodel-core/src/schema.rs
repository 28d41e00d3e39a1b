//! Schema objects: a field definition plus everything attached to it.
//!
//! A [`Schema`] is assembled once and then frozen inside a
//! [`Model`](crate::model::Model). Besides the field definition it carries:
//!
//! - schema options ([`SchemaOptions`]), notably the `toObject` transform
//! - pre and post hooks per [`HookEvent`]
//! - instance methods and statics
//! - index declarations
//!
//! Plugins ([`SchemaPlugin`]) are applied eagerly and may use all of the above.

use bson::{Bson, Document};
use futures::future::BoxFuture;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::warn;

use crate::{
    autoinc::Counter,
    backend::IndexOptions,
    error::ModelResult,
    hooks::{HookEvent, PostHook, PreHook},
    model::{Instance, Model},
};

/// Field name -> field specification, as accepted by [`Schema::new`].
///
/// A field specification is either a type name (`"String"`), a document with a `type`
/// entry and field options (`{ "type": "Number", "min": 0 }`), a nested definition, or
/// a one element array for list fields.
pub type SchemaDefinition = Document;

/// `toObject` transform: receives the stored document and the object being produced,
/// and returns the object to hand out.
pub type Transform = Arc<dyn Fn(&Document, Document) -> Document + Send + Sync>;

/// Method callable on an [`Instance`].
pub type InstanceMethod = Arc<dyn Fn(&Instance, Vec<Bson>) -> ModelResult<Bson> + Send + Sync>;

/// Static callable on a [`Model`].
pub type StaticMethod =
    Arc<dyn Fn(Model, Vec<Bson>) -> BoxFuture<'static, ModelResult<Bson>> + Send + Sync>;

pub type Methods = HashMap<String, InstanceMethod>;
pub type Statics = HashMap<String, StaticMethod>;

/// Options applied by [`Instance::to_object`](crate::model::Instance::to_object).
#[derive(Clone, Default)]
pub struct ToObjectOptions {
    pub transform: Option<Transform>,
}

impl fmt::Debug for ToObjectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToObjectOptions")
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    /// `None` means no `toObject` behaviour has been configured.
    pub to_object: Option<ToObjectOptions>,
    /// Maintain `createdAt` / `updatedAt` on save.
    pub timestamps: bool,
}

/// An index declaration, kept on the schema until the model syncs it to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaIndex {
    pub keys: Document,
    pub options: Option<IndexOptions>,
}

/// Extension applied to a schema at construction time.
pub trait SchemaPlugin {
    fn apply(&self, schema: &mut Schema);
}

#[derive(Clone)]
pub struct Schema {
    definition: SchemaDefinition,
    options: SchemaOptions,
    pre: Vec<(HookEvent, PreHook)>,
    post: Vec<(HookEvent, PostHook)>,
    methods: Methods,
    statics: Statics,
    indexes: Vec<SchemaIndex>,
    counter: Option<Counter>,
}

impl Schema {
    pub fn new(definition: SchemaDefinition) -> Self {
        Self::with_options(definition, SchemaOptions::default())
    }

    pub fn with_options(definition: SchemaDefinition, options: SchemaOptions) -> Self {
        Self {
            definition,
            options,
            pre: Vec::new(),
            post: Vec::new(),
            methods: Methods::new(),
            statics: Statics::new(),
            indexes: Vec::new(),
            counter: None,
        }
    }

    pub fn definition(&self) -> &SchemaDefinition {
        &self.definition
    }

    /// Top level field names of the definition, in declaration order.
    pub fn paths(&self) -> Vec<&str> {
        self.definition
            .keys()
            .map(String::as_str)
            .collect()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.definition.contains_key(path)
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SchemaOptions {
        &mut self.options
    }

    /// Registers a pre hook. Hooks for the same event run in registration order.
    ///
    /// Pre hooks on [`HookEvent::Find`] are kept but never run.
    pub fn pre(&mut self, event: HookEvent, hook: PreHook) -> &mut Self {
        if event == HookEvent::Find {
            warn!(%event, "pre hooks never run for this event");
        }

        self.pre.push((event, hook));
        self
    }

    /// Registers a post hook. Hooks for the same event run in registration order.
    pub fn post(&mut self, event: HookEvent, hook: PostHook) -> &mut Self {
        self.post.push((event, hook));
        self
    }

    pub fn pre_hooks(&self, event: HookEvent) -> Vec<PreHook> {
        self.pre
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, hook)| hook.clone())
            .collect()
    }

    pub fn post_hooks(&self, event: HookEvent) -> Vec<PostHook> {
        self.post
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, hook)| hook.clone())
            .collect()
    }

    pub fn plugin(&mut self, plugin: &impl SchemaPlugin) -> &mut Self {
        plugin.apply(self);
        self
    }

    /// Declares an index on `keys`. `options` is `None` for a plain index.
    pub fn index(&mut self, keys: Document, options: Option<IndexOptions>) -> &mut Self {
        self.indexes.push(SchemaIndex { keys, options });
        self
    }

    pub fn indexes(&self) -> &[SchemaIndex] {
        &self.indexes
    }

    /// Replaces the whole instance method table.
    pub fn set_methods(&mut self, methods: Methods) -> &mut Self {
        self.methods = methods;
        self
    }

    pub fn methods(&self) -> &Methods {
        &self.methods
    }

    /// Replaces the whole static table.
    pub fn set_statics(&mut self, statics: Statics) -> &mut Self {
        self.statics = statics;
        self
    }

    pub fn statics(&self) -> &Statics {
        &self.statics
    }

    /// Attaches the autoincrement counter numbering this schema's documents.
    pub fn set_counter(&mut self, counter: Counter) -> &mut Self {
        self.counter = Some(counter);
        self
    }

    pub fn counter(&self) -> Option<&Counter> {
        self.counter.as_ref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods = self.methods.keys().collect::<Vec<_>>();
        let mut statics = self.statics.keys().collect::<Vec<_>>();
        methods.sort();
        statics.sort();

        f.debug_struct("Schema")
            .field("definition", &self.definition)
            .field("options", &self.options)
            .field("pre", &self.pre.iter().map(|(e, _)| e).collect::<Vec<_>>())
            .field("post", &self.post.iter().map(|(e, _)| e).collect::<Vec<_>>())
            .field("methods", &methods)
            .field("statics", &statics)
            .field("indexes", &self.indexes)
            .field("counter", &self.counter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{post_hook, pre_hook};
    use bson::doc;

    struct Tag(&'static str);

    impl SchemaPlugin for Tag {
        fn apply(&self, schema: &mut Schema) {
            let field = self.0;
            schema.index(doc! { field: 1 }, None);
        }
    }

    #[test]
    fn paths_follow_declaration_order() {
        let schema = Schema::new(doc! { "name": "String", "age": { "type": "Number" } });

        assert_eq!(schema.paths(), vec!["name", "age"]);
        assert!(schema.has_path("age"));
        assert!(!schema.has_path("email"));
    }

    #[test]
    fn hooks_are_grouped_by_event() {
        let mut schema = Schema::new(doc! { "name": "String" });
        schema
            .pre(HookEvent::Save, pre_hook(|_, next| async move { next.proceed() }))
            .pre(HookEvent::Remove, pre_hook(|_, next| async move { next.proceed() }))
            .pre(HookEvent::Save, pre_hook(|_, next| async move { next.proceed() }))
            .post(HookEvent::Save, post_hook(|_| async {}));

        assert_eq!(schema.pre_hooks(HookEvent::Save).len(), 2);
        assert_eq!(schema.pre_hooks(HookEvent::Remove).len(), 1);
        assert_eq!(schema.post_hooks(HookEvent::Save).len(), 1);
        assert!(schema.post_hooks(HookEvent::Remove).is_empty());
    }

    #[test]
    fn method_tables_are_replaced_not_merged() {
        let mut schema = Schema::new(doc! { "name": "String" });
        let greet: InstanceMethod =
            Arc::new(|_: &Instance, _: Vec<Bson>| -> ModelResult<Bson> { Ok(Bson::from("hi")) });
        let wave: InstanceMethod =
            Arc::new(|_: &Instance, _: Vec<Bson>| -> ModelResult<Bson> { Ok(Bson::from("o/")) });

        schema.set_methods(Methods::from([("greet".to_string(), greet)]));
        schema.set_methods(Methods::from([("wave".to_string(), wave)]));

        assert!(schema.methods().contains_key("wave"));
        assert!(!schema.methods().contains_key("greet"));
    }

    #[test]
    fn plugins_mutate_the_schema() {
        let mut schema = Schema::new(doc! { "name": "String" });
        schema.plugin(&Tag("name"));

        assert_eq!(schema.indexes(), &[SchemaIndex { keys: doc! { "name": 1 }, options: None }]);
    }
}
