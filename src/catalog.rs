//! File type catalog.
//!
//! Fetched once when an uploader session starts and never refreshed. Only
//! active types can be assigned to staged files, but inactive ones stay in
//! the catalog so required-type names still resolve.

use serde::Deserialize;
use std::collections::HashSet;

use crate::{Result, UploaderError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeDescriptor {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

/// File type as returned by `GET /tipos-archivos/getAll`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiFileType {
    pub tipo_archivo_id: i64,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub extensiones_permitidas: Option<Vec<String>>,
    #[serde(default)]
    pub activo: Option<bool>,
}

impl From<ApiFileType> for FileTypeDescriptor {
    fn from(t: ApiFileType) -> Self {
        Self {
            id: t.tipo_archivo_id,
            name: t.nombre,
            // Absent flag means active.
            active: t.activo != Some(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    #[serde(default)]
    pub pages: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default)]
pub struct FileTypeCatalog {
    types: Vec<FileTypeDescriptor>,
}

impl FileTypeCatalog {
    pub fn from_descriptors(types: Vec<FileTypeDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for t in &types {
            if !seen.insert(t.id) {
                return Err(UploaderError::Catalog(format!(
                    "duplicate file type id {}",
                    t.id
                )));
            }
        }
        Ok(Self { types })
    }

    pub fn get(&self, id: i64) -> Option<&FileTypeDescriptor> {
        self.types.iter().find(|t| t.id == id)
    }

    /// Display name for a type id, `ID <n>` when the catalog does not know it.
    pub fn name_of(&self, id: i64) -> String {
        self.get(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("ID {}", id))
    }

    pub fn all(&self) -> &[FileTypeDescriptor] {
        &self.types
    }

    pub fn active(&self) -> impl Iterator<Item = &FileTypeDescriptor> {
        self.types.iter().filter(|t| t.active)
    }

    pub fn active_ids(&self) -> HashSet<i64> {
        self.active().map(|t| t.id).collect()
    }

    pub fn is_active(&self, id: i64) -> bool {
        self.get(id).map(|t| t.active).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: i64, name: &str, active: bool) -> FileTypeDescriptor {
        FileTypeDescriptor {
            id,
            name: name.to_string(),
            active,
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = FileTypeCatalog::from_descriptors(vec![
            descriptor(1, "Foto de Perfil", true),
            descriptor(1, "Otra", true),
        ]);
        assert!(matches!(result, Err(UploaderError::Catalog(_))));
    }

    #[test]
    fn test_active_subset() {
        let catalog = FileTypeCatalog::from_descriptors(vec![
            descriptor(1, "Foto de Perfil", true),
            descriptor(4, "Contrato", false),
            descriptor(5, "Hoja de Vida", true),
        ])
        .unwrap();

        assert_eq!(catalog.active_ids(), HashSet::from([1, 5]));
        assert!(catalog.is_active(5));
        assert!(!catalog.is_active(4));
        assert!(!catalog.is_active(99));
    }

    #[test]
    fn test_name_of_falls_back_to_id() {
        let catalog =
            FileTypeCatalog::from_descriptors(vec![descriptor(2, "Documento de Identidad", true)])
                .unwrap();
        assert_eq!(catalog.name_of(2), "Documento de Identidad");
        assert_eq!(catalog.name_of(3), "ID 3");
    }

    #[test]
    fn test_wire_format_missing_activo_is_active() {
        let body = r#"{
            "success": true,
            "data": [
                {"tipo_archivo_id": 1, "nombre": "Foto de Perfil"},
                {"tipo_archivo_id": 4, "nombre": "Contrato", "activo": false,
                 "extensiones_permitidas": [".pdf"]}
            ],
            "pagination": {"total": 2, "limit": 100, "offset": 0, "pages": 1}
        }"#;
        let page: PaginatedResponse<ApiFileType> = serde_json::from_str(body).unwrap();
        let types: Vec<FileTypeDescriptor> = page.data.into_iter().map(Into::into).collect();

        assert!(types[0].active);
        assert!(!types[1].active);
        assert_eq!(page.pagination.unwrap().total, 2);
    }
}
