//! Formatting helpers shared by every serializer.

pub mod csv;
pub mod ids;
pub mod text;
pub mod xml;

pub use csv::{CsvTable, escape_csv_field, neutralize_formula};
pub use ids::{IdCounter, sanitize_identifier, slugify};
pub use text::{single_line, strip_html, truncate};
pub use xml::{XmlWriter, escape_xml};
