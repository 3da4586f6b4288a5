/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::profile::parser::parse::to_ascii_lowercase;
use std::collections::HashMap;

/// Key-Value property pair
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Property {
    key: String,
    value: String,
}

impl Property {
    /// Value of this property
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name of this property
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Creates a new property
    pub fn new(key: String, value: String) -> Self {
        Property { key, value }
    }
}

/// A top-level section (`[profile name]`, `[sso-session name]`) of a config file.
pub(super) trait Section {
    /// The name of this section
    fn name(&self) -> &str;

    /// Insert a property into a section, replacing any previous value
    fn insert(&mut self, name: String, value: Property);
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
struct SectionInner {
    name: String,
    properties: HashMap<String, Property>,
}

impl SectionInner {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .get(to_ascii_lowercase(name).as_ref())
            .map(|prop| prop.value())
    }

    fn insert(&mut self, name: String, value: Property) {
        self.properties
            .insert(to_ascii_lowercase(&name).into(), value);
    }
}

/// An individual configuration profile
///
/// An AWS config may be composed of a multiple named profiles within a
/// [`ProfileSet`](crate::profile::ProfileSet). Property names are case-insensitive.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Profile(SectionInner);

impl Profile {
    /// Create a new profile
    pub fn new(name: impl Into<String>, properties: HashMap<String, Property>) -> Self {
        let mut profile = Self(SectionInner::new(name));
        for (key, property) in properties {
            profile.0.insert(key, property);
        }
        profile
    }

    /// The name of this profile
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns a reference to the property named `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name)
    }

    /// True if this profile has no properties
    pub fn is_empty(&self) -> bool {
        self.0.properties.is_empty()
    }
}

impl Section for Profile {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn insert(&mut self, name: String, value: Property) {
        self.0.insert(name, value)
    }
}

/// A `[sso-session name]` section in the config.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SsoSession(SectionInner);

impl SsoSession {
    pub(super) fn new(name: impl Into<String>) -> Self {
        Self(SectionInner::new(name))
    }

    /// Returns a reference to the property named `name`
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name)
    }
}

impl Section for SsoSession {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn insert(&mut self, name: String, value: Property) {
        self.0.insert(name, value)
    }
}
