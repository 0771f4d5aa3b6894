// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::{AvroResult, Schema, error::Error};
use regex_lite::Regex;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

/// Represents names for `record`, `enum` and `fixed` Avro schemas.
///
/// Each of these schemas has a `fullname` composed of a short name and an
/// optional namespace. A name mentioned inside an enclosing schema inherits
/// the enclosing namespace unless it is already dotted, so all `Name`s held
/// by a parsed schema are fully qualified.
///
/// More information about schema names can be found in the
/// [Avro specification](https://avro.apache.org/docs/++version++/specification/#names)
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct Name {
    pub name: String,
    pub namespace: Namespace,
}

/// Represents schema lookup within a parsed schema: fully qualified name to
/// owned named-type definition.
pub type Names = HashMap<Name, Schema>;
/// Represents schema lookup within a borrowed schema tree.
pub type NamesRef<'a> = HashMap<Name, &'a Schema>;
/// Represents the namespace of a named schema.
pub type Namespace = Option<String>;

fn schema_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("schema name pattern is valid")
    })
}

fn validate_schema_name(name: &str) -> AvroResult<()> {
    if schema_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidSchemaName(name.to_string()))
    }
}

fn validate_namespace(namespace: &str) -> AvroResult<()> {
    if namespace
        .split('.')
        .all(|part| schema_name_pattern().is_match(part))
    {
        Ok(())
    } else {
        Err(Error::InvalidNamespace(namespace.to_string()))
    }
}

impl Name {
    /// Create a new `Name`, splitting an optional dotted namespace off the
    /// short name.
    pub fn new(name: &str) -> AvroResult<Self> {
        Self::new_with_enclosing_namespace(name, None)
    }

    /// Create a new `Name` using the namespace from `enclosing_namespace` if
    /// `name` does not carry one itself. An already-dotted `name` keeps its
    /// own namespace; a leading dot pins the name to the empty namespace.
    pub fn new_with_enclosing_namespace(
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Self> {
        if let Some(index) = name.rfind('.') {
            let (namespace, short) = name.split_at(index);
            let short = &short[1..];
            validate_schema_name(short)?;
            if namespace.is_empty() {
                // A leading dot means "no namespace".
                Ok(Self {
                    name: short.to_string(),
                    namespace: None,
                })
            } else {
                validate_namespace(namespace)?;
                Ok(Self {
                    name: short.to_string(),
                    namespace: Some(namespace.to_string()),
                })
            }
        } else {
            validate_schema_name(name)?;
            let namespace = match enclosing_namespace {
                Some(ns) if !ns.is_empty() => {
                    validate_namespace(ns)?;
                    Some(ns.to_string())
                }
                _ => None,
            };
            Ok(Self {
                name: name.to_string(),
                namespace,
            })
        }
    }

    /// Return the `fullname` of this `Name`: `namespace.name`, or the bare
    /// name when there is no namespace.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Name {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Name");
        debug.field("name", &self.name);
        if let Some(namespace) = &self.namespace {
            debug.field("namespace", namespace);
        }
        debug.finish()
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
