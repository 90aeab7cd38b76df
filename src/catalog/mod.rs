//! Function catalog
//!
//! Read-only registry of the application functions the resolver gates. The
//! catalog is built once at startup (from the built-in table or from the JSON
//! file named by `FUNCTION_CATALOG_PATH`) and shared behind an `Arc`.

mod builtin;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::errors::{AppError, AppResult};
use crate::models::function::{AppFunction, CategoryInfo};

#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    functions: Vec<AppFunction>,
    index: HashMap<String, usize>,
}

impl FunctionCatalog {
    /// Functions are kept in declaration order. Duplicate ids are rejected.
    pub fn from_functions(functions: Vec<AppFunction>) -> AppResult<Self> {
        let mut index = HashMap::with_capacity(functions.len());
        for (pos, function) in functions.iter().enumerate() {
            if function.id.trim().is_empty() {
                return Err(AppError::configuration("function id must not be empty"));
            }
            if index.insert(function.id.clone(), pos).is_some() {
                return Err(AppError::configuration(format!(
                    "duplicate function id in catalog: {}",
                    function.id
                )));
            }
        }

        Ok(Self { functions, index })
    }

    pub fn builtin() -> Self {
        let functions = builtin::FUNCTIONS
            .iter()
            .map(|(id, name, category, module, description)| AppFunction {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                module: module.to_string(),
                description: description.to_string(),
                is_active: true,
            })
            .collect::<Vec<_>>();

        let index = functions
            .iter()
            .enumerate()
            .map(|(pos, f)| (f.id.clone(), pos))
            .collect();

        Self { functions, index }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read function catalog at {}", path.display()))?;
        let functions: Vec<AppFunction> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid function catalog JSON in {}", path.display()))?;
        Ok(Self::from_functions(functions)?)
    }

    /// Catalog for this process: `FUNCTION_CATALOG_PATH` when set, the built-in
    /// table otherwise.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("FUNCTION_CATALOG_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                let catalog = Self::from_json_file(Path::new(path.trim()))?;
                tracing::info!(path = %path, functions = catalog.len(), "loaded function catalog");
                Ok(catalog)
            }
            _ => Ok(Self::builtin()),
        }
    }

    pub fn list_functions(&self) -> &[AppFunction] {
        &self.functions
    }

    pub fn by_id(&self, id: &str) -> AppResult<&AppFunction> {
        self.get(id)
            .ok_or_else(|| AppError::not_found(format!("function {id}")))
    }

    pub fn get(&self, id: &str) -> Option<&AppFunction> {
        self.index.get(id).map(|&pos| &self.functions[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Grants may only reference catalog functions.
    pub fn require(&self, id: &str) -> AppResult<&AppFunction> {
        self.get(id).ok_or_else(|| AppError::unknown_function(id))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Distinct category tags in declaration order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for function in &self.functions {
            if !seen.contains(&function.category.as_str()) {
                seen.push(function.category.as_str());
            }
        }
        seen
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a AppFunction> + 'a {
        self.functions.iter().filter(move |f| f.category == category)
    }

    /// The catalog's spelling of `module`, matched case-insensitively.
    pub fn module(&self, module: &str) -> Option<&str> {
        self.functions
            .iter()
            .map(|f| f.module.as_str())
            .find(|m| m.eq_ignore_ascii_case(module))
    }

    /// Distinct modules of a category in declaration order. Empty for an
    /// unknown category.
    pub fn modules_in_category(&self, category: &str) -> Vec<&str> {
        let mut modules: Vec<&str> = Vec::new();
        for function in self.functions.iter().filter(|f| f.category == category) {
            if !modules.contains(&function.module.as_str()) {
                modules.push(function.module.as_str());
            }
        }
        modules
    }
}

pub fn category_info(tag: &str) -> &'static CategoryInfo {
    builtin::CATEGORIES
        .iter()
        .find(|c| c.tag == tag)
        .unwrap_or(&builtin::FALLBACK_CATEGORY)
}
