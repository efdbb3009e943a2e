//! Grammar context shared by all sessions: lattice, features, type
//! prototypes, quick-check paths and restriction defaults.

use crate::arena::{DagArena, NodeId};
use crate::jxchg::{DagDisplay, JxchgError, JxchgReader};
use crate::quick_check::{QcError, QcPaths};
use crate::restrictor::{DeleteSet, Restrictor, RestrictorError, RestrictorTree};
use crate::session::Session;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use tfs_common::{FeatureId, SymbolTable, TypeId};
use tfs_lattice::{LatticeBuilder, LatticeError, TypeLattice};
use tracing::debug;

pub const ARGS_FEATURE: &str = "ARGS";
pub const FIRST_FEATURE: &str = "FIRST";
pub const REST_FEATURE: &str = "REST";
pub const KEY_ARG_FEATURE: &str = "KEY-ARG";
/// Value of `KEY-ARG` that marks the key argument.
pub const KEY_ARG_MARKER: &str = "+";
pub const LIST_FEATURE: &str = "LIST";
pub const LAST_FEATURE: &str = "LAST";
pub const SLASH_FEATURE: &str = "SLASH";
pub const DIFF_LIST_TYPE: &str = "*diff-list*";

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    #[error("unknown type `{name}`")]
    UnknownType { name: String },
    #[error("unknown feature `{name}`")]
    UnknownFeature { name: String },
    #[error("prototype of `{ty}`")]
    Prototype {
        ty: String,
        #[source]
        source: JxchgError,
    },
    #[error("prototype of `{ty}` has root type `{found}`")]
    PrototypeMismatch { ty: String, found: String },
    #[error("malformed feature structure")]
    Jxchg(#[from] JxchgError),
    #[error(transparent)]
    Restrictor(#[from] RestrictorError),
    #[error(transparent)]
    QuickCheck(#[from] QcError),
    #[error("invalid grammar description")]
    Description(#[from] serde_json::Error),
}

/// Feature ids with a fixed meaning for rule application.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpecialFeatures {
    pub args: Option<FeatureId>,
    pub first: Option<FeatureId>,
    pub rest: Option<FeatureId>,
    pub key_arg: Option<FeatureId>,
    /// Front of a difference list.
    pub list: Option<FeatureId>,
    /// Tail of a difference list.
    pub last: Option<FeatureId>,
    pub slash: Option<FeatureId>,
}

/// Appropriateness condition of one feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Appropriateness {
    /// Most general type that carries the feature.
    pub introduced_by: TypeId,
    /// Type of the feature's value in the prototype of `introduced_by`,
    /// `*top*` when there is none.
    pub max_type: TypeId,
}

/// Everything a unification episode needs besides its own arena.
///
/// Immutable once built apart from the lattice's GLB cache and atom table,
/// so one grammar can serve many threads, each with its own [`Session`].
pub struct Grammar {
    lattice: TypeLattice,
    features: SymbolTable<FeatureId>,
    prototypes: DagArena,
    prototype_roots: FxHashMap<TypeId, NodeId>,
    quick_check: QcPaths,
    restrictor: Restrictor,
    special: SpecialFeatures,
    key_arg_marker: Option<TypeId>,
    diff_list_type: Option<TypeId>,
    appropriate: FxHashMap<FeatureId, Appropriateness>,
}

impl Grammar {
    pub fn builder(lattice: TypeLattice) -> GrammarBuilder {
        GrammarBuilder::new(lattice)
    }

    /// Build from a JSON grammar description.
    pub fn from_json(reader: impl Read) -> Result<Self, GrammarError> {
        let description: GrammarDescription = serde_json::from_reader(reader)?;
        Self::from_description(&description)
    }

    pub fn from_description(description: &GrammarDescription) -> Result<Self, GrammarError> {
        let mut lattice = LatticeBuilder::new();
        for decl in &description.types {
            lattice.declare(&decl.name, decl.parents.iter().map(String::as_str))?;
        }
        let mut builder = GrammarBuilder::new(lattice.build()?);
        for feature in &description.features {
            builder.feature(feature);
        }
        for (ty, text) in &description.prototypes {
            builder.prototype(ty, text)?;
        }
        if !description.quick_check.is_empty() {
            builder.quick_check_paths(&description.quick_check)?;
        }
        for (feature, ty) in &description.appropriate {
            builder.appropriate(feature, ty)?;
        }
        builder.delete_features(&description.delete_features)?;
        if let Some(text) = &description.restrictor {
            builder.restrictor(text)?;
        }
        Ok(builder.build())
    }

    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    pub fn features(&self) -> &SymbolTable<FeatureId> {
        &self.features
    }

    pub fn feature_id(&self, name: &str) -> Option<FeatureId> {
        self.features.get(name)
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.lattice.type_id(name)
    }

    /// Arena holding all prototypes and the root of `ty`'s prototype.
    pub fn prototype(&self, ty: TypeId) -> Option<(&DagArena, NodeId)> {
        self.prototype_roots
            .get(&ty)
            .map(|&root| (&self.prototypes, root))
    }

    pub fn quick_check(&self) -> &QcPaths {
        &self.quick_check
    }

    /// Restrictor applied by default when copying rule results.
    pub fn restrictor(&self) -> &Restrictor {
        &self.restrictor
    }

    pub fn delete_set(&self) -> &DeleteSet {
        self.restrictor.delete_set()
    }

    pub fn special_features(&self) -> SpecialFeatures {
        self.special
    }

    /// Type of the `KEY-ARG` marker value, if the grammar has one.
    pub fn key_arg_marker(&self) -> Option<TypeId> {
        self.key_arg_marker
    }

    pub fn diff_list_type(&self) -> Option<TypeId> {
        self.diff_list_type
    }

    pub fn appropriateness(&self, feature: FeatureId) -> Option<Appropriateness> {
        self.appropriate.get(&feature).copied()
    }

    /// Type introducing `feature`.
    pub fn appropriate_type(&self, feature: FeatureId) -> Option<TypeId> {
        self.appropriateness(feature).map(|a| a.introduced_by)
    }

    /// Most specific type a value of `feature` gets from completion alone.
    pub fn max_appropriate_type(&self, feature: FeatureId) -> Option<TypeId> {
        self.appropriateness(feature).map(|a| a.max_type)
    }

    pub fn reader(&self) -> JxchgReader<'_> {
        JxchgReader::new(&self.lattice, &self.features)
    }

    pub fn display<'a>(&'a self, arena: &'a DagArena, root: NodeId) -> DagDisplay<'a> {
        DagDisplay::new(arena, root, &self.lattice, &self.features)
    }

    /// Start a new session with its own arena.
    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("types", &self.lattice.type_count())
            .field("features", &self.features.len())
            .field("prototypes", &self.prototype_roots.len())
            .field("quick_check", &self.quick_check.len())
            .finish_non_exhaustive()
    }
}

/// Programmatic grammar construction.
#[derive(Debug)]
pub struct GrammarBuilder {
    lattice: TypeLattice,
    features: SymbolTable<FeatureId>,
    prototypes: DagArena,
    prototype_roots: FxHashMap<TypeId, NodeId>,
    quick_check: QcPaths,
    delete: DeleteSet,
    restrictor: Option<RestrictorTree>,
    appropriate: FxHashMap<FeatureId, TypeId>,
}

impl GrammarBuilder {
    pub fn new(lattice: TypeLattice) -> Self {
        GrammarBuilder {
            lattice,
            features: SymbolTable::new(),
            prototypes: DagArena::new(),
            prototype_roots: FxHashMap::default(),
            quick_check: QcPaths::empty(),
            delete: DeleteSet::new(),
            restrictor: None,
            appropriate: FxHashMap::default(),
        }
    }

    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    pub fn feature(&mut self, name: &str) -> FeatureId {
        self.features.intern(name)
    }

    pub fn features<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for name in names {
            self.features.intern(name);
        }
        self
    }

    fn resolve_feature(&self, name: &str) -> Result<FeatureId, GrammarError> {
        self.features
            .get(name)
            .ok_or_else(|| GrammarError::UnknownFeature {
                name: name.to_string(),
            })
    }

    /// Register the prototype of `ty` from jxchg text. The root type of the
    /// prototype must be `ty`.
    pub fn prototype(&mut self, ty: &str, text: &str) -> Result<&mut Self, GrammarError> {
        let id = self
            .lattice
            .type_id(ty)
            .ok_or_else(|| GrammarError::UnknownType { name: ty.to_string() })?;
        let reader = JxchgReader::new(&self.lattice, &self.features);
        let root = reader
            .parse(&mut self.prototypes, text)
            .map_err(|source| GrammarError::Prototype {
                ty: ty.to_string(),
                source,
            })?;
        let found = self.prototypes.node_type(root);
        if found != id {
            return Err(GrammarError::PrototypeMismatch {
                ty: ty.to_string(),
                found: self.lattice.type_name(found).unwrap_or_default().into_owned(),
            });
        }
        self.prototype_roots.insert(id, root);
        Ok(self)
    }

    /// Quick-check paths as feature-name lists; the `i`-th path fills
    /// position `i`.
    pub fn quick_check_paths<P, S>(&mut self, paths: &[P]) -> Result<&mut Self, GrammarError>
    where
        P: AsRef<[S]>,
        S: AsRef<str>,
    {
        let resolved = paths
            .iter()
            .map(|path| {
                path.as_ref()
                    .iter()
                    .map(|name| self.resolve_feature(name.as_ref()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.quick_check = QcPaths::from_paths(resolved);
        Ok(self)
    }

    /// Quick-check paths from a pseudo-dag in jxchg text.
    pub fn quick_check_dag(&mut self, text: &str) -> Result<&mut Self, GrammarError> {
        let mut scratch = DagArena::new();
        let root = JxchgReader::new(&self.lattice, &self.features).parse(&mut scratch, text)?;
        self.quick_check = QcPaths::from_pseudo_dag(&scratch, root, &self.lattice)?;
        Ok(self)
    }

    /// Declare `ty` as the type introducing `feature`. The maximal
    /// appropriate value type is read from `ty`'s prototype when the
    /// grammar is built.
    pub fn appropriate(&mut self, feature: &str, ty: &str) -> Result<&mut Self, GrammarError> {
        let feature = self.resolve_feature(feature)?;
        let ty = self
            .lattice
            .type_id(ty)
            .ok_or_else(|| GrammarError::UnknownType { name: ty.to_string() })?;
        self.appropriate.insert(feature, ty);
        Ok(self)
    }

    /// Features dropped from every copied rule result.
    pub fn delete_features<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut Self, GrammarError> {
        for name in names {
            let feature = self.resolve_feature(name.as_ref())?;
            self.delete.insert(feature);
        }
        Ok(self)
    }

    /// Default restrictor from a pseudo-dag in jxchg text.
    pub fn restrictor(&mut self, text: &str) -> Result<&mut Self, GrammarError> {
        let mut scratch = DagArena::new();
        let root = JxchgReader::new(&self.lattice, &self.features).parse(&mut scratch, text)?;
        self.restrictor = Some(RestrictorTree::from_pseudo_dag(&scratch, root, &self.lattice)?);
        Ok(self)
    }

    pub fn build(self) -> Grammar {
        let special = SpecialFeatures {
            args: self.features.get(ARGS_FEATURE),
            first: self.features.get(FIRST_FEATURE),
            rest: self.features.get(REST_FEATURE),
            key_arg: self.features.get(KEY_ARG_FEATURE),
            list: self.features.get(LIST_FEATURE),
            last: self.features.get(LAST_FEATURE),
            slash: self.features.get(SLASH_FEATURE),
        };
        let key_arg_marker = self.lattice.type_id(KEY_ARG_MARKER);
        let diff_list_type = self.lattice.type_id(DIFF_LIST_TYPE);
        let appropriate: FxHashMap<FeatureId, Appropriateness> = self
            .appropriate
            .iter()
            .map(|(&feature, &introduced_by)| {
                let max_type = self
                    .prototype_roots
                    .get(&introduced_by)
                    .and_then(|&root| self.prototypes.value(root, feature))
                    .map_or(TypeId::TOP, |value| self.prototypes.node_type(value));
                (feature, Appropriateness { introduced_by, max_type })
            })
            .collect();
        let restrictor = match self.restrictor {
            Some(tree) => Restrictor::Tree(tree.with_delete_set(self.delete)),
            None => Restrictor::Simple(self.delete),
        };
        debug!(
            target: "tfs::grammar",
            types = self.lattice.type_count(),
            features = self.features.len(),
            prototypes = self.prototype_roots.len(),
            quick_check = self.quick_check.len(),
            appropriate = appropriate.len(),
            "grammar built"
        );
        Grammar {
            lattice: self.lattice,
            features: self.features,
            prototypes: self.prototypes,
            prototype_roots: self.prototype_roots,
            quick_check: self.quick_check,
            restrictor,
            special,
            key_arg_marker,
            diff_list_type,
            appropriate,
        }
    }
}

/// Serializable grammar description.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarDescription {
    pub types: Vec<TypeDecl>,
    pub features: Vec<String>,
    /// Type name to prototype in jxchg text.
    pub prototypes: BTreeMap<String, String>,
    pub quick_check: Vec<Vec<String>>,
    /// Feature name to the name of the type introducing it.
    pub appropriate: BTreeMap<String, String>,
    pub delete_features: Vec<String>,
    pub restrictor: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[cfg(test)]
#[path = "../tests/grammar_tests.rs"]
mod tests;
