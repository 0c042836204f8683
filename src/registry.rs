//! Resource registry - per-type descriptors for identity, attributes and relationships.
//!
//! Each Rust type is registered once through a [`ResourceBuilder`], which records
//! typed accessors for its fields. The registry erases those accessors behind
//! `dyn Any` so that the serializer can walk heterogeneous object graphs.
//!
//! ```
//! use jsonapi_marshal::{Registry, ResourceBuilder};
//!
//! struct Greeting {
//!     id: Option<String>,
//!     message: Option<String>,
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .register(
//!         ResourceBuilder::new(
//!             "greeting",
//!             "/greetings",
//!             |id| Greeting { id, message: None },
//!             |g| &g.id,
//!         )
//!         .attribute("message", |g| &g.message, |g| &mut g.message),
//!     )
//!     .unwrap();
//!
//! let greeting = Greeting { id: Some("abc-123".into()), message: None };
//! assert_eq!(registry.identity_of(&greeting).unwrap(), "abc-123");
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RegistryError;
use crate::types::{is_valid_member_name, json_type_name};

/// Default identity field.
pub const DEFAULT_IDENTITY_FIELD: &str = "id";

type ReadFn = Box<dyn Fn(&dyn Any) -> Option<Result<Value, serde_json::Error>> + Send + Sync>;
type WriteFn =
    Box<dyn Fn(&mut dyn Any, Value) -> Option<Result<(), serde_json::Error>> + Send + Sync>;
type ConstructFn = Box<dyn Fn(Option<String>) -> Box<dyn Any> + Send + Sync>;

/// Whether a relationship holds zero-or-one or a sequence of related resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Borrowed view of a relationship's current value.
pub enum Related<'a> {
    One(Option<&'a dyn Any>),
    Many(Vec<&'a dyn Any>),
}

/// Identity-only instances handed to a relationship setter.
pub(crate) enum Stubs {
    One(Box<dyn Any>),
    Many(Vec<Box<dyn Any>>),
}

trait RelationAccess: Send + Sync {
    fn related<'a>(&self, resource: &'a dyn Any) -> Option<Related<'a>>;
    fn assign(&self, resource: &mut dyn Any, stubs: Stubs) -> Option<()>;
}

struct ToOneAccess<T, R, G, S> {
    get: G,
    set: S,
    _types: PhantomData<fn() -> (T, R)>,
}

impl<T, R, G, S> RelationAccess for ToOneAccess<T, R, G, S>
where
    T: Any,
    R: Any,
    G: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync,
    S: Fn(&mut T, R) + Send + Sync,
{
    fn related<'a>(&self, resource: &'a dyn Any) -> Option<Related<'a>> {
        let resource = resource.downcast_ref::<T>()?;
        Some(Related::One((self.get)(resource).map(|r| r as &dyn Any)))
    }

    fn assign(&self, resource: &mut dyn Any, stubs: Stubs) -> Option<()> {
        let resource = resource.downcast_mut::<T>()?;
        let Stubs::One(stub) = stubs else {
            return None;
        };
        let stub = stub.downcast::<R>().ok()?;
        (self.set)(resource, *stub);
        Some(())
    }
}

struct ToManyAccess<T, R, G, S> {
    get: G,
    set: S,
    _types: PhantomData<fn() -> (T, R)>,
}

impl<T, R, G, S> RelationAccess for ToManyAccess<T, R, G, S>
where
    T: Any,
    R: Any,
    G: for<'a> Fn(&'a T) -> Option<&'a [R]> + Send + Sync,
    S: Fn(&mut T, Vec<R>) + Send + Sync,
{
    fn related<'a>(&self, resource: &'a dyn Any) -> Option<Related<'a>> {
        let resource = resource.downcast_ref::<T>()?;
        let items = (self.get)(resource)
            .unwrap_or_default()
            .iter()
            .map(|r| r as &dyn Any)
            .collect();
        Some(Related::Many(items))
    }

    fn assign(&self, resource: &mut dyn Any, stubs: Stubs) -> Option<()> {
        let resource = resource.downcast_mut::<T>()?;
        let Stubs::Many(stubs) = stubs else {
            return None;
        };
        let items = stubs
            .into_iter()
            .map(|stub| stub.downcast::<R>().ok().map(|r| *r))
            .collect::<Option<Vec<R>>>()?;
        (self.set)(resource, items);
        Some(())
    }
}

/// Registration options for an attribute.
#[derive(Debug, Clone, Default)]
pub struct AttributeOptions {
    /// Wire name, when it differs from the field name.
    pub rename: Option<String>,
    pub required: bool,
    /// Extra JSON Schema constraint checked on inbound documents.
    pub schema: Option<Value>,
}

impl AttributeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Registration options for a relationship.
#[derive(Debug, Clone, Default)]
pub struct RelationshipOptions {
    pub rename: Option<String>,
    pub required: bool,
    /// Emit `links.self` (`.../relationships/<name>`).
    pub self_link: bool,
    /// Emit `links.related` (`.../<name>`).
    pub related_link: bool,
}

impl RelationshipOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn self_link(mut self) -> Self {
        self.self_link = true;
        self
    }

    pub fn related_link(mut self) -> Self {
        self.related_link = true;
        self
    }
}

struct IdentityField {
    field: String,
    read: ReadFn,
}

/// Describes how one attribute maps between a field and the wire.
pub struct AttributeDescriptor {
    source_field: String,
    wire_name: String,
    required: bool,
    schema: Option<Value>,
    read: ReadFn,
    write: WriteFn,
}

impl AttributeDescriptor {
    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub(crate) fn read(&self, resource: &dyn Any) -> Option<Result<Value, serde_json::Error>> {
        (self.read)(resource)
    }

    pub(crate) fn write(
        &self,
        resource: &mut dyn Any,
        value: Value,
    ) -> Option<Result<(), serde_json::Error>> {
        (self.write)(resource, value)
    }
}

impl fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("source_field", &self.source_field)
            .field("wire_name", &self.wire_name)
            .field("required", &self.required)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Describes how one relationship maps between a field and the wire.
pub struct RelationshipDescriptor {
    source_field: String,
    wire_name: String,
    cardinality: Cardinality,
    target: TypeId,
    target_name: &'static str,
    self_link: bool,
    related_link: bool,
    required: bool,
    access: Box<dyn RelationAccess>,
}

impl RelationshipDescriptor {
    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Rust type name of the related resource.
    pub fn target_name(&self) -> &'static str {
        self.target_name
    }

    pub fn self_link(&self) -> bool {
        self.self_link
    }

    pub fn related_link(&self) -> bool {
        self.related_link
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub(crate) fn related<'a>(&self, resource: &'a dyn Any) -> Option<Related<'a>> {
        self.access.related(resource)
    }

    pub(crate) fn assign(&self, resource: &mut dyn Any, stubs: Stubs) -> Option<()> {
        self.access.assign(resource, stubs)
    }
}

impl fmt::Debug for RelationshipDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipDescriptor")
            .field("source_field", &self.source_field)
            .field("wire_name", &self.wire_name)
            .field("cardinality", &self.cardinality)
            .field("target", &self.target_name)
            .field("self_link", &self.self_link)
            .field("related_link", &self.related_link)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Everything the serializer and deserializer know about one resource type.
pub struct ResourceDescriptor {
    wire_type: String,
    base_path: String,
    type_id: TypeId,
    type_name: &'static str,
    identity: IdentityField,
    attributes: Vec<AttributeDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
    construct: ConstructFn,
}

impl ResourceDescriptor {
    pub fn wire_type(&self) -> &str {
        &self.wire_type
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn identity_field(&self) -> &str {
        &self.identity.field
    }

    /// Attributes in registration order.
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Relationships in registration order.
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    /// Read the wire identity of `resource`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::WrongType` if `resource` is not of this type,
    /// `RegistryError::IdentityUnreadable` if the identity does not convert to
    /// JSON, or `RegistryError::IdentityType` if it is not a string.
    pub fn identity_of(&self, resource: &dyn Any) -> Result<String, RegistryError> {
        let value = match (self.identity.read)(resource) {
            Some(Ok(value)) => value,
            Some(Err(source)) => {
                return Err(RegistryError::IdentityUnreadable {
                    wire_type: self.wire_type.clone(),
                    field: self.identity.field.clone(),
                    source,
                })
            }
            None => {
                return Err(RegistryError::WrongType {
                    wire_type: self.wire_type.clone(),
                    expected: self.type_name,
                })
            }
        };

        match value {
            Value::String(id) => Ok(id),
            other => Err(RegistryError::IdentityType {
                wire_type: self.wire_type.clone(),
                field: self.identity.field.clone(),
                actual: json_type_name(&other),
            }),
        }
    }

    /// Build an identity-only instance of this type.
    pub(crate) fn construct(&self, id: Option<String>) -> Box<dyn Any> {
        (self.construct)(id)
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("wire_type", &self.wire_type)
            .field("base_path", &self.base_path)
            .field("type_name", &self.type_name)
            .field("identity", &self.identity.field)
            .field("attributes", &self.attributes)
            .field("relationships", &self.relationships)
            .finish_non_exhaustive()
    }
}

/// Typed registration of one resource type.
pub struct ResourceBuilder<T> {
    wire_type: String,
    base_path: String,
    identity: IdentityField,
    attributes: Vec<AttributeDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
    construct: ConstructFn,
    _type: PhantomData<fn() -> T>,
}

impl<T> ResourceBuilder<T>
where
    T: Any,
{
    /// Start registering `T` as `wire_type`, served under `base_path`.
    ///
    /// `construct` builds an instance carrying only its identity; it is used for
    /// every inbound resource and relationship stub. `id` reads the identity field,
    /// reported as `id` until [`identity_field`](Self::identity_field) renames it.
    pub fn new<C, F, G>(
        wire_type: impl Into<String>,
        base_path: impl Into<String>,
        construct: C,
        id: G,
    ) -> Self
    where
        C: Fn(Option<String>) -> T + Send + Sync + 'static,
        F: Serialize + 'static,
        G: for<'a> Fn(&'a T) -> &'a F + Send + Sync + 'static,
    {
        let read: ReadFn = Box::new(move |resource: &dyn Any| {
            resource
                .downcast_ref::<T>()
                .map(|r| serde_json::to_value(id(r)))
        });

        Self {
            wire_type: wire_type.into(),
            base_path: base_path.into(),
            identity: IdentityField {
                field: DEFAULT_IDENTITY_FIELD.to_string(),
                read,
            },
            attributes: Vec::new(),
            relationships: Vec::new(),
            construct: Box::new(move |id| -> Box<dyn Any> { Box::new(construct(id)) }),
            _type: PhantomData,
        }
    }

    /// Name the identity field `field` in errors and descriptors.
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity.field = field.into();
        self
    }

    pub fn attribute<F, G, M>(self, field: impl Into<String>, get: G, get_mut: M) -> Self
    where
        F: Serialize + DeserializeOwned + 'static,
        G: for<'a> Fn(&'a T) -> &'a F + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut F + Send + Sync + 'static,
    {
        self.attribute_with(field, get, get_mut, AttributeOptions::default())
    }

    pub fn attribute_with<F, G, M>(
        mut self,
        field: impl Into<String>,
        get: G,
        get_mut: M,
        options: AttributeOptions,
    ) -> Self
    where
        F: Serialize + DeserializeOwned + 'static,
        G: for<'a> Fn(&'a T) -> &'a F + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut F + Send + Sync + 'static,
    {
        let source_field = field.into();
        let read: ReadFn = Box::new(move |resource: &dyn Any| {
            resource
                .downcast_ref::<T>()
                .map(|r| serde_json::to_value(get(r)))
        });
        let write: WriteFn = Box::new(move |resource: &mut dyn Any, value: Value| {
            resource.downcast_mut::<T>().map(|r| {
                serde_json::from_value::<F>(value).map(|v| {
                    *get_mut(r) = v;
                })
            })
        });

        self.attributes.push(AttributeDescriptor {
            wire_name: options.rename.unwrap_or_else(|| source_field.clone()),
            source_field,
            required: options.required,
            schema: options.schema,
            read,
            write,
        });
        self
    }

    pub fn to_one<R, G, S>(self, field: impl Into<String>, get: G, set: S) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
        S: Fn(&mut T, R) + Send + Sync + 'static,
    {
        self.to_one_with(field, get, set, RelationshipOptions::default())
    }

    pub fn to_one_with<R, G, S>(
        self,
        field: impl Into<String>,
        get: G,
        set: S,
        options: RelationshipOptions,
    ) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
        S: Fn(&mut T, R) + Send + Sync + 'static,
    {
        let access = ToOneAccess::<T, R, G, S> {
            get,
            set,
            _types: PhantomData,
        };
        self.relationship::<R>(field.into(), Cardinality::ToOne, Box::new(access), options)
    }

    pub fn to_many<R, G, S>(self, field: impl Into<String>, get: G, set: S) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a [R]> + Send + Sync + 'static,
        S: Fn(&mut T, Vec<R>) + Send + Sync + 'static,
    {
        self.to_many_with(field, get, set, RelationshipOptions::default())
    }

    pub fn to_many_with<R, G, S>(
        self,
        field: impl Into<String>,
        get: G,
        set: S,
        options: RelationshipOptions,
    ) -> Self
    where
        R: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a [R]> + Send + Sync + 'static,
        S: Fn(&mut T, Vec<R>) + Send + Sync + 'static,
    {
        let access = ToManyAccess::<T, R, G, S> {
            get,
            set,
            _types: PhantomData,
        };
        self.relationship::<R>(field.into(), Cardinality::ToMany, Box::new(access), options)
    }

    fn relationship<R: Any>(
        mut self,
        source_field: String,
        cardinality: Cardinality,
        access: Box<dyn RelationAccess>,
        options: RelationshipOptions,
    ) -> Self {
        self.relationships.push(RelationshipDescriptor {
            wire_name: options.rename.unwrap_or_else(|| source_field.clone()),
            source_field,
            cardinality,
            target: TypeId::of::<R>(),
            target_name: type_name::<R>(),
            self_link: options.self_link,
            related_link: options.related_link,
            required: options.required,
            access,
        });
        self
    }

    fn build(self) -> Result<ResourceDescriptor, RegistryError> {
        check_name("type", &self.wire_type)?;
        for attribute in &self.attributes {
            check_name("attribute", &attribute.wire_name)?;
        }
        for relationship in &self.relationships {
            check_name("relationship", &relationship.wire_name)?;
        }

        Ok(ResourceDescriptor {
            wire_type: self.wire_type,
            base_path: self.base_path,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            identity: self.identity,
            attributes: self.attributes,
            relationships: self.relationships,
            construct: self.construct,
        })
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<(), RegistryError> {
    if is_valid_member_name(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Descriptors for every registered resource type.
///
/// Populated once at startup, then shared read-only.
#[derive(Default)]
pub struct Registry {
    by_type: HashMap<TypeId, ResourceDescriptor>,
    by_wire: HashMap<String, TypeId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a resource type.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidName` if the type or any member name is not a
    /// valid JSON:API member name, or `RegistryError::DuplicateType` if the wire type
    /// or the Rust type is already registered.
    pub fn register<T>(&mut self, builder: ResourceBuilder<T>) -> Result<&mut Self, RegistryError>
    where
        T: Any,
    {
        let descriptor = builder.build()?;

        if self.by_wire.contains_key(&descriptor.wire_type)
            || self.by_type.contains_key(&descriptor.type_id)
        {
            return Err(RegistryError::DuplicateType {
                wire_type: descriptor.wire_type,
            });
        }

        debug!(
            wire_type = %descriptor.wire_type,
            rust_type = descriptor.type_name,
            attributes = descriptor.attributes.len(),
            relationships = descriptor.relationships.len(),
            "registered resource"
        );

        self.by_wire
            .insert(descriptor.wire_type.clone(), descriptor.type_id);
        self.by_type.insert(descriptor.type_id, descriptor);
        Ok(self)
    }

    /// Descriptor registered for `T`.
    pub fn lookup<T: Any>(&self) -> Result<&ResourceDescriptor, RegistryError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .ok_or_else(|| RegistryError::NotRegistered {
                type_name: type_name::<T>().to_string(),
            })
    }

    /// Descriptor registered under a wire type name.
    pub fn lookup_wire(&self, wire_type: &str) -> Result<&ResourceDescriptor, RegistryError> {
        self.by_wire
            .get(wire_type)
            .and_then(|type_id| self.by_type.get(type_id))
            .ok_or_else(|| RegistryError::NotRegistered {
                type_name: wire_type.to_string(),
            })
    }

    /// Descriptor for the concrete type behind `resource`, if registered.
    pub fn descriptor_of(&self, resource: &dyn Any) -> Option<&ResourceDescriptor> {
        self.by_type.get(&resource.type_id())
    }

    /// Descriptor of the type a relationship points to.
    pub fn target_of(
        &self,
        relationship: &RelationshipDescriptor,
    ) -> Result<&ResourceDescriptor, RegistryError> {
        self.by_type
            .get(&relationship.target)
            .ok_or_else(|| RegistryError::NotRegistered {
                type_name: relationship.target_name.to_string(),
            })
    }

    /// Wire identity of any registered resource.
    pub fn identity_of<T: Any>(&self, resource: &T) -> Result<String, RegistryError> {
        let descriptor =
            self.descriptor_of(resource)
                .ok_or_else(|| RegistryError::NotRegistered {
                    type_name: type_name::<T>().to_string(),
                })?;
        descriptor.identity_of(resource)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.by_wire.keys().collect();
        types.sort();
        f.debug_struct("Registry").field("types", &types).finish()
    }
}
