//! Data provider and dataset descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of records a dataset delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DatasetType {
    #[default]
    Observations,
    Checklists,
}

/// Package layout delivered at a dataset's data URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PackageFormat {
    /// Zip with `eml.xml` and a tab-delimited `occurrence.txt`
    #[default]
    DarwinCoreArchive,
    /// JSON array exported by the NORS fish survey API
    NorsJson,
}

impl PackageFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            PackageFormat::DarwinCoreArchive => "zip",
            PackageFormat::NorsJson => "json",
        }
    }
}

/// One dataset published by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescriptor {
    pub identifier: String,
    /// Missing when the dataset is maintained outside the harvest
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default)]
    pub metadata_url: Option<String>,
    #[serde(default)]
    pub dataset_type: DatasetType,
    #[serde(default)]
    pub format: PackageFormat,
    /// Keep the downloaded package as an attachment after a successful run
    #[serde(default)]
    pub retain_source: bool,
    /// Publication timestamp seen in the last successful harvest
    #[serde(default)]
    pub source_date: Option<DateTime<Utc>>,
}

impl DatasetDescriptor {
    pub fn is_externally_maintained(&self) -> bool {
        self.data_url
            .as_deref()
            .map(|url| url.trim().is_empty())
            .unwrap_or(true)
    }
}

/// Identity of a data source and the datasets it publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProviderDescriptor {
    pub id: i32,
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    pub datasets: Vec<DatasetDescriptor>,
}

impl DataProviderDescriptor {
    /// Collection readers query
    pub fn permanent_collection(&self) -> String {
        format!("observations_{}", self.id)
    }

    /// Landing collection filled during a harvest and swapped in on success
    pub fn temp_collection(&self) -> String {
        format!("observations_{}_temp", self.id)
    }

    pub fn dataset(&self, identifier: &str) -> Option<&DatasetDescriptor> {
        self.datasets.iter().find(|d| d.identifier == identifier)
    }

    pub fn dataset_mut(&mut self, identifier: &str) -> Option<&mut DatasetDescriptor> {
        self.datasets.iter_mut().find(|d| d.identifier == identifier)
    }
}
