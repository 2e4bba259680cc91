//! Pluggable Deserialisierung fremder Attribute und Elemente.
//!
//! Jedes Attribut und jedes Kind-Element außerhalb des XSD-Namespace (und
//! außerhalb der festen Dispatch-Tabellen) wird an eine per QName
//! registrierte [`ExtensionDeserializer`]-Implementierung übergeben. Die
//! Default-Implementierung legt den Roh-Inhalt unter den beiden
//! Metadaten-Buckets des besitzenden Objekts ab
//! ([`ObjectMeta::external_attributes`] / [`ObjectMeta::external_elements`]),
//! sodass er Round-Trips übersteht, auch wenn der Kern ihn nicht versteht.

use crate::FastHashMap;
use crate::error::Result;
use crate::qname::QName;
use crate::schema::ObjectMeta;

/// Deserialisiert ein fremdes Attribut oder Element auf ein Schema-Objekt.
pub trait ExtensionDeserializer {
    /// Behandelt ein fremdes Attribut; `value` ist der Attributwert.
    fn attribute(&self, owner: &mut ObjectMeta, name: &QName, value: &str) -> Result<()>;

    /// Behandelt ein fremdes Element; `raw` ist der unveränderte
    /// Quelltext-Ausschnitt des Elements.
    fn element(&self, owner: &mut ObjectMeta, name: &QName, raw: &str) -> Result<()>;
}

/// Default-Handler: Roh-Inhalt in die Metadaten-Buckets des Besitzers.
#[derive(Debug, Default)]
pub struct MetadataBucketHandler;

impl ExtensionDeserializer for MetadataBucketHandler {
    fn attribute(&self, owner: &mut ObjectMeta, name: &QName, value: &str) -> Result<()> {
        owner
            .external_attributes
            .insert(name.clone(), value.to_string());
        Ok(())
    }

    fn element(&self, owner: &mut ObjectMeta, name: &QName, raw: &str) -> Result<()> {
        owner.external_elements.insert(name.clone(), raw.to_string());
        Ok(())
    }
}

/// Registry der Extension-Handler, per QName mit Default-Fallback.
pub struct ExtensionRegistry {
    handlers: FastHashMap<QName, Box<dyn ExtensionDeserializer>>,
    default_handler: Box<dyn ExtensionDeserializer>,
}

impl ExtensionRegistry {
    /// Registry mit dem Metadaten-Bucket-Default.
    pub fn new() -> Self {
        Self {
            handlers: FastHashMap::default(),
            default_handler: Box::new(MetadataBucketHandler),
        }
    }

    /// Registriert einen Handler für einen konkreten QName.
    pub fn register(&mut self, name: QName, handler: Box<dyn ExtensionDeserializer>) {
        self.handlers.insert(name, handler);
    }

    /// Ersetzt den Default-Handler.
    pub fn set_default(&mut self, handler: Box<dyn ExtensionDeserializer>) {
        self.default_handler = handler;
    }

    fn handler(&self, name: &QName) -> &dyn ExtensionDeserializer {
        match self.handlers.get(name) {
            Some(handler) => handler.as_ref(),
            None => self.default_handler.as_ref(),
        }
    }

    /// Leitet ein fremdes Attribut an den zuständigen Handler weiter.
    pub(crate) fn deserialize_attribute(
        &self,
        owner: &mut ObjectMeta,
        name: &QName,
        value: &str,
    ) -> Result<()> {
        self.handler(name).attribute(owner, name, value)
    }

    /// Leitet ein fremdes Element an den zuständigen Handler weiter.
    pub(crate) fn deserialize_element(
        &self,
        owner: &mut ObjectMeta,
        name: &QName,
        raw: &str,
    ) -> Result<()> {
        self.handler(name).element(owner, name, raw)
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ExtensionRegistry({} handlers)", self.handlers.len())
    }
}
