//! Reserved keyword vocabulary
//!
//! Every `_`-prefixed key a document or schema may carry is a member of
//! this closed set. Dispatch is total: parsing happens once, and every
//! phase matches on the enum, so an unknown reserved key is rejected at
//! the boundary instead of leaking into open-ended string comparisons.

use strata_core::FieldType;
use strata_spatial::GeoCast;

/// Separator joining field-path segments.
pub const PATH_SEP: char = '.';

/// Comment prefix: fields starting with this are skipped entirely.
pub const COMMENT_PREFIX: char = '#';

/// Reserved metadata key a shard stores the schema under.
pub const SCHEMA_METADATA_KEY: &str = "schema";

/// The wildcard entry in `_ignore` that disables recursion.
pub const IGNORE_ALL: &str = "*";

/// All recognized reserved keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedWord {
    // Structural
    Id,
    Version,
    Schema,
    Schemas,
    Settings,
    Endpoint,
    Type,
    ValueKw,
    Data,
    Ignore,
    Recurse,
    Script,
    Chai,
    // Indexing policy
    Index,
    Store,
    Weight,
    Position,
    Spelling,
    Positions,
    BoolTerm,
    PartialPaths,
    IndexUuidField,
    Namespace,
    // Detection toggles
    DateDetection,
    DatetimeDetection,
    TimeDetection,
    TimedeltaDetection,
    NumericDetection,
    GeoDetection,
    BoolDetection,
    TextDetection,
    UuidDetection,
    Dynamic,
    Strict,
    // Text
    Ngram,
    CjkNgram,
    CjkWords,
    Language,
    StopStrategy,
    StemStrategy,
    StemLanguage,
    // Storage
    Prefix,
    Slot,
    Accuracy,
    AccPrefix,
    // Geo
    Partials,
    GeoError,
    // Casts
    CastFloat,
    CastInteger,
    CastPositive,
    CastBoolean,
    CastKeyword,
    CastText,
    CastString,
    CastDate,
    CastTime,
    CastTimedelta,
    CastDatetime,
    CastUuid,
    CastEwkt,
    CastPoint,
    CastCircle,
    CastConvex,
    CastPolygon,
    CastChull,
    CastMultipoint,
    CastMulticircle,
    CastMulticonvex,
    CastMultipolygon,
    CastMultichull,
    CastGeoCollection,
    CastGeoIntersection,
}

impl ReservedWord {
    /// Total parse over the closed vocabulary. `None` means the key is
    /// reserved-looking but unknown, which callers reject.
    pub fn parse(key: &str) -> Option<ReservedWord> {
        Some(match key {
            "_id" => ReservedWord::Id,
            "_version" => ReservedWord::Version,
            "_schema" => ReservedWord::Schema,
            "_schemas" => ReservedWord::Schemas,
            "_settings" => ReservedWord::Settings,
            "_endpoint" => ReservedWord::Endpoint,
            "_type" => ReservedWord::Type,
            "_value" => ReservedWord::ValueKw,
            "_data" => ReservedWord::Data,
            "_ignore" => ReservedWord::Ignore,
            "_recurse" => ReservedWord::Recurse,
            "_script" => ReservedWord::Script,
            "_chai" => ReservedWord::Chai,
            "_index" => ReservedWord::Index,
            "_store" => ReservedWord::Store,
            "_weight" => ReservedWord::Weight,
            "_position" => ReservedWord::Position,
            "_spelling" => ReservedWord::Spelling,
            "_positions" => ReservedWord::Positions,
            "_bool_term" => ReservedWord::BoolTerm,
            "_partial_paths" => ReservedWord::PartialPaths,
            "_index_uuid_field" => ReservedWord::IndexUuidField,
            "_namespace" => ReservedWord::Namespace,
            "_date_detection" => ReservedWord::DateDetection,
            "_datetime_detection" => ReservedWord::DatetimeDetection,
            "_time_detection" => ReservedWord::TimeDetection,
            "_timedelta_detection" => ReservedWord::TimedeltaDetection,
            "_numeric_detection" => ReservedWord::NumericDetection,
            "_geo_detection" => ReservedWord::GeoDetection,
            "_bool_detection" => ReservedWord::BoolDetection,
            "_text_detection" => ReservedWord::TextDetection,
            "_uuid_detection" => ReservedWord::UuidDetection,
            "_dynamic" => ReservedWord::Dynamic,
            "_strict" => ReservedWord::Strict,
            "_ngram" => ReservedWord::Ngram,
            "_cjk_ngram" => ReservedWord::CjkNgram,
            "_cjk_words" => ReservedWord::CjkWords,
            "_language" => ReservedWord::Language,
            "_stop_strategy" => ReservedWord::StopStrategy,
            "_stem_strategy" => ReservedWord::StemStrategy,
            "_stem_language" => ReservedWord::StemLanguage,
            "_prefix" => ReservedWord::Prefix,
            "_slot" => ReservedWord::Slot,
            "_accuracy" => ReservedWord::Accuracy,
            "_acc_prefix" => ReservedWord::AccPrefix,
            "_partials" => ReservedWord::Partials,
            "_error" => ReservedWord::GeoError,
            "_float" => ReservedWord::CastFloat,
            "_integer" => ReservedWord::CastInteger,
            "_positive" => ReservedWord::CastPositive,
            "_boolean" => ReservedWord::CastBoolean,
            "_keyword" | "_term" => ReservedWord::CastKeyword,
            "_text" => ReservedWord::CastText,
            "_string" => ReservedWord::CastString,
            "_date" => ReservedWord::CastDate,
            "_time" => ReservedWord::CastTime,
            "_timedelta" => ReservedWord::CastTimedelta,
            "_datetime" => ReservedWord::CastDatetime,
            "_uuid" => ReservedWord::CastUuid,
            "_ewkt" => ReservedWord::CastEwkt,
            "_point" => ReservedWord::CastPoint,
            "_circle" => ReservedWord::CastCircle,
            "_convex" => ReservedWord::CastConvex,
            "_polygon" => ReservedWord::CastPolygon,
            "_chull" => ReservedWord::CastChull,
            "_multipoint" => ReservedWord::CastMultipoint,
            "_multicircle" => ReservedWord::CastMulticircle,
            "_multiconvex" => ReservedWord::CastMulticonvex,
            "_multipolygon" => ReservedWord::CastMultipolygon,
            "_multichull" => ReservedWord::CastMultichull,
            "_geo_collection" => ReservedWord::CastGeoCollection,
            "_geo_intersection" => ReservedWord::CastGeoIntersection,
            _ => return None,
        })
    }

    /// The concrete type a cast keyword declares, if this is a cast.
    pub fn cast_type(self) -> Option<FieldType> {
        Some(match self {
            ReservedWord::CastFloat => FieldType::Floating,
            ReservedWord::CastInteger => FieldType::Integer,
            ReservedWord::CastPositive => FieldType::Positive,
            ReservedWord::CastBoolean => FieldType::Boolean,
            ReservedWord::CastKeyword => FieldType::Keyword,
            ReservedWord::CastText => FieldType::Text,
            ReservedWord::CastString => FieldType::String,
            ReservedWord::CastDate => FieldType::Date,
            ReservedWord::CastTime => FieldType::Time,
            ReservedWord::CastTimedelta => FieldType::Timedelta,
            ReservedWord::CastDatetime => FieldType::Datetime,
            ReservedWord::CastUuid => FieldType::Uuid,
            ReservedWord::CastEwkt
            | ReservedWord::CastPoint
            | ReservedWord::CastCircle
            | ReservedWord::CastConvex
            | ReservedWord::CastPolygon
            | ReservedWord::CastChull
            | ReservedWord::CastMultipoint
            | ReservedWord::CastMulticircle
            | ReservedWord::CastMulticonvex
            | ReservedWord::CastMultipolygon
            | ReservedWord::CastMultichull
            | ReservedWord::CastGeoCollection
            | ReservedWord::CastGeoIntersection => FieldType::Geo,
            _ => return None,
        })
    }

    /// The geometry cast kind, for geo casts.
    pub fn geo_cast(self) -> Option<GeoCast> {
        Some(match self {
            ReservedWord::CastEwkt => GeoCast::Ewkt,
            ReservedWord::CastPoint => GeoCast::Point,
            ReservedWord::CastCircle => GeoCast::Circle,
            ReservedWord::CastConvex => GeoCast::Convex,
            ReservedWord::CastPolygon => GeoCast::Polygon,
            ReservedWord::CastChull => GeoCast::Chull,
            ReservedWord::CastMultipoint => GeoCast::MultiPoint,
            ReservedWord::CastMulticircle => GeoCast::MultiCircle,
            ReservedWord::CastMulticonvex => GeoCast::MultiConvex,
            ReservedWord::CastMultipolygon => GeoCast::MultiPolygon,
            ReservedWord::CastMultichull => GeoCast::MultiChull,
            ReservedWord::CastGeoCollection => GeoCast::Collection,
            ReservedWord::CastGeoIntersection => GeoCast::Intersection,
            _ => return None,
        })
    }
}

/// Reserved keys start with an underscore.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with('_')
}

/// Comment keys are skipped without error.
pub fn is_comment(name: &str) -> bool {
    name.starts_with(COMMENT_PREFIX)
}

/// A usable document field name: non-empty, not reserved, not a comment.
pub fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty() && !is_reserved(name) && !is_comment(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_is_closed() {
        assert_eq!(ReservedWord::parse("_type"), Some(ReservedWord::Type));
        assert_eq!(ReservedWord::parse("_meta"), None);
        assert_eq!(ReservedWord::parse("type"), None);
    }

    #[test]
    fn term_is_keyword_synonym() {
        assert_eq!(ReservedWord::parse("_term"), Some(ReservedWord::CastKeyword));
        assert_eq!(
            ReservedWord::parse("_keyword"),
            Some(ReservedWord::CastKeyword)
        );
    }

    #[test]
    fn cast_types() {
        assert_eq!(
            ReservedWord::CastPoint.cast_type(),
            Some(FieldType::Geo)
        );
        assert_eq!(
            ReservedWord::CastInteger.cast_type(),
            Some(FieldType::Integer)
        );
        assert_eq!(ReservedWord::Type.cast_type(), None);
    }

    #[test]
    fn field_name_validity() {
        assert!(is_valid_field_name("name"));
        assert!(!is_valid_field_name("_type"));
        assert!(!is_valid_field_name("#comment"));
        assert!(!is_valid_field_name(""));
    }
}
