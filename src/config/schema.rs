// Declarative schema: variables plus a menu tree of field entries
//
// Menu entries are tag-first JSON arrays:
//   ["submenu", title, child...]
//   ["page", title, child..., conditional?]
//   ["scalar", name, short_name, units, offset, encoding, exponent, conditional?]
//   ["select", name, short_name, offset, [choice...], conditional?]
//   ["varselect", name, short_name, offset, conditional?]
//   ["text", name, short_name, offset, length, conditional?]
//   ["table", name, short_name, units, offset, encoding, exponent, conditional?]

use crate::conditional::parser::is_keyword;
use crate::core::{Encoding, ValueTree, Variable};
use crate::error::SchemaError;
use crate::fields::{FieldDescriptor, Scalar, Select, Table, Text, VarSelect};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

lazy_static::lazy_static! {
    static ref SHORT_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Short names double as conditional identifiers, so they must be
/// identifiers and not one of the conditional keywords
pub fn is_valid_short_name(name: &str) -> bool {
    SHORT_NAME.is_match(name) && !is_keyword(name)
}

/// Navigation tree shown by an editor; not used by decode or encode
#[derive(Debug, Clone, PartialEq)]
pub enum MenuNode {
    Submenu {
        title: String,
        children: Vec<MenuNode>,
    },
    Page {
        title: String,
        children: Vec<MenuNode>,
        conditional: Option<String>,
    },
    Field {
        kind: &'static str,
        title: String,
        short_name: String,
        conditional: Option<String>,
    },
}

impl MenuNode {
    pub fn title(&self) -> &str {
        match self {
            MenuNode::Submenu { title, .. }
            | MenuNode::Page { title, .. }
            | MenuNode::Field { title, .. } => title,
        }
    }

    pub fn children(&self) -> &[MenuNode] {
        match self {
            MenuNode::Submenu { children, .. } | MenuNode::Page { children, .. } => children,
            MenuNode::Field { .. } => &[],
        }
    }

    pub fn conditional(&self) -> Option<&str> {
        match self {
            MenuNode::Submenu { .. } => None,
            MenuNode::Page { conditional, .. } | MenuNode::Field { conditional, .. } => {
                conditional.as_deref()
            }
        }
    }
}

/// Top-level schema object as it appears in JSON
#[derive(Debug, Deserialize)]
struct RawSchema {
    total_size: usize,
    table_offset: usize,
    variables: Vec<Variable>,
    fields: Vec<Json>,
}

/// A parsed schema, before cross-field checks
#[derive(Debug, Clone)]
pub struct Schema {
    pub total_size: usize,
    /// Lowest offset a table region may occupy
    pub table_offset: usize,
    pub variables: Vec<Variable>,
    pub menu: Vec<MenuNode>,
    /// Every field entry in declaration order
    pub fields: Vec<FieldDescriptor>,
    /// The JSON this schema was read from
    pub source: Json,
}

impl Schema {
    pub fn from_json(source: &Json) -> Result<Self, SchemaError> {
        let raw = RawSchema::deserialize(source)?;
        if let Some(bad) = raw
            .variables
            .iter()
            .find(|v| !is_valid_short_name(&v.short_name))
        {
            return Err(SchemaError::InvalidName(bad.short_name.clone()));
        }

        let mut fields = Vec::new();
        let menu = raw
            .fields
            .iter()
            .map(|entry| parse_menu(entry, &mut fields))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            total_size: raw.total_size,
            table_offset: raw.table_offset,
            variables: raw.variables,
            menu,
            fields,
            source: source.clone(),
        })
    }

    pub fn parse(json: &str) -> Result<Self, SchemaError> {
        Self::from_json(&serde_json::from_str(json)?)
    }
}

/// Schema and decoded values saved together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneDocument {
    pub config: Json,
    pub tune: ValueTree,
}

/// Cursor over the items of one tag-first entry
struct Entry<'a> {
    tag: &'a str,
    items: &'a [Json],
    pos: usize,
}

impl<'a> Entry<'a> {
    fn new(json: &'a Json) -> Result<Self, SchemaError> {
        let items = json
            .as_array()
            .ok_or_else(|| SchemaError::Malformed(format!("menu entry is not an array: {}", json)))?;
        let tag = items
            .first()
            .and_then(Json::as_str)
            .ok_or_else(|| SchemaError::Malformed(format!("menu entry without a tag: {}", json)))?;
        Ok(Self { tag, items, pos: 1 })
    }

    fn malformed(&self, what: &str) -> SchemaError {
        SchemaError::Malformed(format!("{} entry: {} at position {}", self.tag, what, self.pos))
    }

    fn next(&mut self) -> Result<&'a Json, SchemaError> {
        let item = self
            .items
            .get(self.pos)
            .ok_or_else(|| self.malformed("missing item"))?;
        self.pos += 1;
        Ok(item)
    }

    fn string(&mut self) -> Result<String, SchemaError> {
        match self.next()? {
            Json::String(s) => Ok(s.clone()),
            _ => Err(self.malformed("expected a string")),
        }
    }

    fn short_name(&mut self) -> Result<String, SchemaError> {
        let name = self.string()?;
        if !is_valid_short_name(&name) {
            return Err(SchemaError::InvalidName(name));
        }
        Ok(name)
    }

    fn offset(&mut self) -> Result<usize, SchemaError> {
        self.next()?
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| self.malformed("expected a non-negative integer"))
    }

    fn number(&mut self) -> Result<f64, SchemaError> {
        self.next()?
            .as_f64()
            .ok_or_else(|| self.malformed("expected a number"))
    }

    fn exponent(&mut self) -> Result<i32, SchemaError> {
        self.next()?
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| self.malformed("expected an integer exponent"))
    }

    fn encoding(&mut self, field: &str) -> Result<Encoding, SchemaError> {
        let encoding = self.number()?;
        Encoding::from_schema(encoding).ok_or_else(|| SchemaError::InvalidEncoding {
            field: field.to_string(),
            encoding,
        })
    }

    fn choices(&mut self) -> Result<Vec<String>, SchemaError> {
        let list = self
            .next()?
            .as_array()
            .ok_or_else(|| self.malformed("expected a choice list"))?;
        list.iter()
            .map(|c| {
                c.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.malformed("choices must be strings"))
            })
            .collect()
    }

    /// Optional trailing conditional, then the end of the entry
    fn conditional(&mut self) -> Result<Option<String>, SchemaError> {
        let cond = match self.items.get(self.pos) {
            None | Some(Json::Null) => None,
            Some(Json::String(s)) => Some(s.clone()),
            Some(_) => return Err(self.malformed("expected a conditional string")),
        };
        if self.items.len() > self.pos + 1 {
            return Err(self.malformed("unexpected trailing items"));
        }
        Ok(cond)
    }
}

fn parse_menu(json: &Json, fields: &mut Vec<FieldDescriptor>) -> Result<MenuNode, SchemaError> {
    let mut entry = Entry::new(json)?;
    match entry.tag {
        "submenu" => {
            let title = entry.string()?;
            let children = entry.items[entry.pos..]
                .iter()
                .map(|c| parse_menu(c, fields))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MenuNode::Submenu { title, children })
        }
        "page" => {
            let title = entry.string()?;
            let mut rest = &entry.items[entry.pos..];
            let conditional = match rest.last() {
                Some(Json::String(s)) => Some(s.clone()),
                _ => None,
            };
            if matches!(rest.last(), Some(Json::String(_) | Json::Null)) {
                rest = &rest[..rest.len() - 1];
            }
            let children = rest
                .iter()
                .map(|c| parse_menu(c, fields))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MenuNode::Page {
                title,
                children,
                conditional,
            })
        }
        _ => {
            let field = parse_field(&mut entry)?;
            let node = MenuNode::Field {
                kind: field.kind(),
                title: field.name().to_string(),
                short_name: field.short_name().to_string(),
                conditional: field.conditional().map(str::to_string),
            };
            fields.push(field);
            Ok(node)
        }
    }
}

fn parse_field(entry: &mut Entry<'_>) -> Result<FieldDescriptor, SchemaError> {
    let field = match entry.tag {
        "scalar" => {
            let name = entry.string()?;
            let short_name = entry.short_name()?;
            let units = entry.string()?;
            let offset = entry.offset()?;
            let encoding = entry.encoding(&short_name)?;
            let exponent = entry.exponent()?;
            Scalar::new(name, short_name, units, offset, encoding, exponent)?
                .with_conditional(entry.conditional()?)
                .into()
        }
        "select" => {
            let name = entry.string()?;
            let short_name = entry.short_name()?;
            let offset = entry.offset()?;
            let choices = entry.choices()?;
            Select::new(name, short_name, offset, choices)
                .with_conditional(entry.conditional()?)
                .into()
        }
        "varselect" => {
            let name = entry.string()?;
            let short_name = entry.short_name()?;
            let offset = entry.offset()?;
            VarSelect::new(name, short_name, offset)
                .with_conditional(entry.conditional()?)
                .into()
        }
        "text" => {
            let name = entry.string()?;
            let short_name = entry.short_name()?;
            let offset = entry.offset()?;
            let length = entry.offset()?;
            Text::new(name, short_name, offset, length)
                .with_conditional(entry.conditional()?)
                .into()
        }
        "table" => {
            let name = entry.string()?;
            let short_name = entry.short_name()?;
            let units = entry.string()?;
            let offset = entry.offset()?;
            let encoding = entry.encoding(&short_name)?;
            let exponent = entry.exponent()?;
            Table::new(name, short_name, units, offset, encoding, exponent)
                .with_conditional(entry.conditional()?)
                .into()
        }
        other => return Err(SchemaError::UnknownKind(other.to_string())),
    };
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Json {
        json!({
            "total_size": 256,
            "table_offset": 64,
            "variables": [
                ["Engine::RPM", "rpm", false, "rpm", 0, 2, 0],
                ["Engine::MAP", "map", false, "kPa", 2, 2, -1],
            ],
            "fields": [
                ["submenu", "Engine",
                    ["page", "Limits",
                        ["scalar", "RPM limit", "rpm_limit", "rpm", 4, 2, 0],
                        ["select", "Cut mode", "cut_mode", 6, ["fuel", "spark"], "rpm_limit > 0"],
                    ],
                    ["page", "Names$name",
                        ["text", "Name", "name", 8, 16, null],
                        ["varselect", "Load", "load", 7],
                        "cut_mode == 'spark'",
                    ],
                ],
                ["table", "Fuel", "fuel", "%", 24, 0.5, 0],
            ],
        })
    }

    #[test]
    fn test_parse_sample() {
        let schema = Schema::from_json(&sample()).unwrap();
        assert_eq!(schema.total_size, 256);
        assert_eq!(schema.table_offset, 64);
        assert_eq!(schema.variables[1].short_name, "map");

        let names: Vec<&str> = schema.fields.iter().map(|f| f.short_name()).collect();
        assert_eq!(names, vec!["rpm_limit", "cut_mode", "name", "load", "fuel"]);
        assert_eq!(schema.fields[1].conditional(), Some("rpm_limit > 0"));
        assert_eq!(schema.fields[2].conditional(), None);
        let fuel = schema.fields[4].as_table().unwrap();
        assert_eq!(fuel.encoding, Encoding::unsigned(4).unwrap());

        assert_eq!(schema.menu.len(), 2);
        let engine = &schema.menu[0];
        assert_eq!(engine.title(), "Engine");
        let names_page = &engine.children()[1];
        assert_eq!(names_page.title(), "Names$name");
        assert_eq!(names_page.children().len(), 2);
        assert_eq!(names_page.conditional(), Some("cut_mode == 'spark'"));
        assert!(matches!(
            &schema.menu[1],
            MenuNode::Field { kind: "table", short_name, .. } if short_name == "fuel"
        ));
    }

    #[test]
    fn test_rejects_bad_entries() {
        let with_field = |field: Json| {
            let mut s = sample();
            s["fields"] = json!([field]);
            Schema::from_json(&s)
        };

        assert!(matches!(
            with_field(json!(["gauge", "Dial", "dial", 0])),
            Err(SchemaError::UnknownKind(k)) if k == "gauge"
        ));
        assert!(matches!(
            with_field(json!(["scalar", "Bad", "bad name", "", 0, 2, 0])),
            Err(SchemaError::InvalidName(_))
        ));
        assert!(matches!(
            with_field(json!(["scalar", "Odd", "odd", "", 0, 1.5, 0])),
            Err(SchemaError::InvalidEncoding { .. })
        ));
        assert!(matches!(
            with_field(json!(["table", "T", "t", "", 0, 0, 0])),
            Err(SchemaError::InvalidEncoding { .. })
        ));
        assert!(matches!(
            with_field(json!(["text", "Name", "name", -1, 4])),
            Err(SchemaError::Malformed(_))
        ));
        assert!(matches!(
            with_field(json!(["varselect", "V", "v", 0, "a", "b"])),
            Err(SchemaError::Malformed(_))
        ));
        assert!(matches!(
            with_field(json!("scalar")),
            Err(SchemaError::Malformed(_))
        ));
    }

    #[test]
    fn test_short_names() {
        assert!(is_valid_short_name("rpm_limit"));
        assert!(is_valid_short_name("_x2"));
        assert!(!is_valid_short_name("2x"));
        assert!(!is_valid_short_name("a-b"));
        assert!(!is_valid_short_name(""));
        assert!(!is_valid_short_name("and"));
        assert!(!is_valid_short_name("True"));
        assert!(is_valid_short_name("android"));
    }

    #[test]
    fn test_rejects_bad_variable_names() {
        let mut s = sample();
        s["variables"][0][1] = json!("bad name-1");
        assert!(matches!(
            Schema::from_json(&s),
            Err(SchemaError::InvalidName(n)) if n == "bad name-1"
        ));

        let mut s = sample();
        s["variables"][1][1] = json!("not");
        assert!(matches!(
            Schema::from_json(&s),
            Err(SchemaError::InvalidName(n)) if n == "not"
        ));
    }

    #[test]
    fn test_rejects_keyword_field_names() {
        for word in ["True", "and", "or", "not", "False"] {
            let mut s = sample();
            s["fields"] = json!([["scalar", "Flag", word, "", 4, 1, 0]]);
            assert!(
                matches!(Schema::from_json(&s), Err(SchemaError::InvalidName(n)) if n == word),
                "{} accepted",
                word
            );
        }
    }

    #[test]
    fn test_document_json() {
        let doc: TuneDocument = serde_json::from_value(json!({
            "config": sample(),
            "tune": {"rpm_limit": 6500, "fuel": null},
        }))
        .unwrap();
        assert_eq!(doc.tune.len(), 2);
        assert!(doc.tune["fuel"].is_absent());
        assert!(Schema::from_json(&doc.config).is_ok());
    }
}
