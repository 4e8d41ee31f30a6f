//! One mapper per entity kind.

mod content;
mod content_type;
mod data_type;
mod dictionary;
mod domain;
mod language;
mod macros;
mod relation;
mod template;

pub use content::ContentMapper;
pub use content_type::ContentTypeMapper;
pub use data_type::DataTypeMapper;
pub use dictionary::DictionaryMapper;
pub use domain::DomainMapper;
pub use language::LanguageMapper;
pub use macros::MacroMapper;
pub use relation::RelationTypeMapper;
pub use template::TemplateMapper;
