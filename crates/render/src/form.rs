use indexmap::IndexMap;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::debug;
use workline_engine::{FormDocument, RenderError};

/// Field flag bit 1: the field may not be changed by the user.
const READ_ONLY_FLAG: i64 = 1;
/// Guards against cyclic `Kids` references in malformed documents.
const MAX_FIELD_DEPTH: usize = 32;

/// An AcroForm document with its terminal fields indexed by fully qualified
/// name (`parent.child`).
pub struct PdfForm {
    document: Document,
    fields: IndexMap<String, ObjectId>,
    acroform: AcroFormSlot,
}

/// Where the AcroForm dictionary lives.
#[derive(Debug, Clone, Copy)]
enum AcroFormSlot {
    Referenced(ObjectId),
    /// Inline in the catalog with this id.
    InCatalog(ObjectId),
}

impl PdfForm {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        let document = Document::load_mem(bytes).map_err(malformed)?;
        let acroform = locate_acroform(&document)?;

        let mut fields = IndexMap::new();
        let field_refs = acroform_dictionary(&document, acroform)?
            .get(b"Fields")
            .and_then(Object::as_array)
            .map_err(|_| RenderError::NotAForm("AcroForm has no Fields array".into()))?;
        collect_fields(&document, field_refs, None, 0, &mut fields);
        debug!(field_count = fields.len(), "indexed form fields");

        Ok(Self {
            document,
            fields,
            acroform,
        })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Current value of a text field.
    pub fn text_value(&self, name: &str) -> Option<String> {
        let id = self.fields.get(name)?;
        let value = self.document.get_dictionary(*id).ok()?.get(b"V").ok()?;
        value.as_str().ok().map(decode_text_string)
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .and_then(|id| self.document.get_dictionary(*id).ok())
            .and_then(|field| field.get(b"Ff").and_then(Object::as_i64).ok())
            .is_some_and(|flags| flags & READ_ONLY_FLAG != 0)
    }

    fn field_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary, RenderError> {
        self.document
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(malformed)
    }

    fn acroform_mut(&mut self) -> Result<&mut Dictionary, RenderError> {
        match self.acroform {
            AcroFormSlot::Referenced(id) => self.document.get_object_mut(id).and_then(Object::as_dict_mut),
            AcroFormSlot::InCatalog(catalog_id) => self
                .document
                .get_object_mut(catalog_id)
                .and_then(Object::as_dict_mut)
                .and_then(|catalog| catalog.get_mut(b"AcroForm"))
                .and_then(Object::as_dict_mut),
        }
        .map_err(malformed)
    }
}

impl FormDocument for PdfForm {
    fn set_text_field(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        let id = *self
            .fields
            .get(name)
            .ok_or_else(|| RenderError::FieldNotFound(name.to_string()))?;
        let field = self.field_mut(id)?;
        if let Ok(kind) = field.get(b"FT").and_then(Object::as_name)
            && kind != b"Tx"
        {
            return Err(RenderError::Malformed(format!("field '{name}' is not a text field")));
        }
        field.set("V", encode_text_string(value));
        field.remove(b"AP");
        Ok(())
    }

    /// Locks the form rather than painting it: every field gets the read-only
    /// flag and `NeedAppearances` asks viewers to draw the values. The fields
    /// stay in the AcroForm and nothing is written into page content.
    fn flatten(&mut self) -> Result<(), RenderError> {
        let ids: Vec<ObjectId> = self.fields.values().copied().collect();
        for id in ids {
            let field = self.field_mut(id)?;
            let flags = field.get(b"Ff").and_then(Object::as_i64).unwrap_or(0);
            field.set("Ff", Object::Integer(flags | READ_ONLY_FLAG));
        }
        self.acroform_mut()?.set("NeedAppearances", Object::Boolean(true));
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        self.document
            .save_to(&mut bytes)
            .map_err(|error| RenderError::Malformed(format!("failed to save document: {error}")))?;
        Ok(bytes)
    }
}

fn malformed(error: lopdf::Error) -> RenderError {
    RenderError::Malformed(error.to_string())
}

fn locate_acroform(document: &Document) -> Result<AcroFormSlot, RenderError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(malformed)?;
    let catalog = document.get_dictionary(catalog_id).map_err(malformed)?;
    match catalog.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Ok(AcroFormSlot::Referenced(*id)),
        Ok(Object::Dictionary(_)) => Ok(AcroFormSlot::InCatalog(catalog_id)),
        _ => Err(RenderError::NotAForm("document has no AcroForm dictionary".into())),
    }
}

fn acroform_dictionary(document: &Document, slot: AcroFormSlot) -> Result<&Dictionary, RenderError> {
    match slot {
        AcroFormSlot::Referenced(id) => document.get_dictionary(id),
        AcroFormSlot::InCatalog(catalog_id) => document
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"AcroForm"))
            .and_then(Object::as_dict),
    }
    .map_err(malformed)
}

/// Walks the field tree. A field whose kids carry their own names is a
/// container; anything else is terminal (its kids are widgets).
fn collect_fields(
    document: &Document,
    field_refs: &[Object],
    parent: Option<&str>,
    depth: usize,
    fields: &mut IndexMap<String, ObjectId>,
) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }
    for field_ref in field_refs {
        let Ok(id) = field_ref.as_reference() else { continue };
        let Ok(field) = document.get_dictionary(id) else { continue };

        let partial_name = field.get(b"T").and_then(Object::as_str).ok().map(decode_text_string);
        let full_name = match (parent, partial_name) {
            (Some(parent), Some(partial)) => format!("{parent}.{partial}"),
            (None, Some(partial)) => partial,
            (_, None) => continue,
        };

        let named_kids: Vec<Object> = field
            .get(b"Kids")
            .and_then(Object::as_array)
            .map(|kids| {
                kids.iter()
                    .filter(|kid| {
                        kid.as_reference()
                            .and_then(|kid_id| document.get_dictionary(kid_id))
                            .is_ok_and(|kid| kid.has(b"T"))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if named_kids.is_empty() {
            fields.insert(full_name, id);
        } else {
            collect_fields(document, &named_kids, Some(&full_name), depth + 1, fields);
        }
    }
}

/// PDF text strings are PDFDocEncoding (ASCII-compatible) or UTF-16BE with a
/// byte order mark.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::dictionary;

    /// A one-page document with a `first_name` field, an `address.city` field
    /// under a container and a check box.
    pub(crate) fn sample_form_bytes() -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let address_id = document.new_object_id();

        let first_name_id = document.add_object(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("first_name"),
            "AP" => Dictionary::new(),
        });
        let city_id = document.add_object(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("city"),
            "Parent" => address_id,
        });
        document.objects.insert(
            address_id,
            Object::Dictionary(dictionary! {
                "T" => Object::string_literal("address"),
                "Kids" => vec![Object::Reference(city_id)],
            }),
        );
        let subscribed_id = document.add_object(dictionary! {
            "FT" => "Btn",
            "T" => Object::string_literal("subscribed"),
        });
        let acroform_id = document.add_object(dictionary! {
            "Fields" => vec![
                Object::Reference(first_name_id),
                Object::Reference(address_id),
                Object::Reference(subscribed_id),
            ],
        });
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acroform_id,
        });
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn indexes_fields_by_qualified_name() {
        let form = PdfForm::from_bytes(&sample_form_bytes()).unwrap();
        let names: Vec<&str> = form.field_names().collect();
        assert_eq!(names, vec!["first_name", "address.city", "subscribed"]);
    }

    #[test]
    fn fills_and_flattens_text_fields() {
        let mut form = PdfForm::from_bytes(&sample_form_bytes()).unwrap();
        form.set_text_field("first_name", "Ada").unwrap();
        form.set_text_field("address.city", "Zürich").unwrap();
        form.flatten().unwrap();

        let reloaded = PdfForm::from_bytes(&form.save().unwrap()).unwrap();
        assert_eq!(reloaded.text_value("first_name").as_deref(), Some("Ada"));
        assert_eq!(reloaded.text_value("address.city").as_deref(), Some("Zürich"));
        assert!(reloaded.is_read_only("first_name"));
        assert!(reloaded.is_read_only("subscribed"));
    }

    #[test]
    fn rejects_unknown_and_non_text_fields() {
        let mut form = PdfForm::from_bytes(&sample_form_bytes()).unwrap();
        assert!(matches!(form.set_text_field("missing", "x"), Err(RenderError::FieldNotFound(_))));
        assert!(matches!(form.set_text_field("subscribed", "x"), Err(RenderError::Malformed(_))));
    }

    #[test]
    fn documents_without_forms_are_refused() {
        let mut document = Document::with_version("1.5");
        let pages_id = document.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => Object::Integer(0),
        });
        let catalog_id = document.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        document.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();

        assert!(matches!(PdfForm::from_bytes(&bytes), Err(RenderError::NotAForm(_))));
    }
}
