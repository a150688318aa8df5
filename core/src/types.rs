//! The primitive + pointer + struct + lvalue type lattice, and the struct
//! registry. `DataType` carries an `lvalue` flag folded into its ordering
//! key alongside id/pointer-depth, so it can double as an operator-table
//! key.

use std::cmp::Ordering;
use std::collections::HashMap;

/// id for the `char` primitive.
pub const CHAR_ID: i32 = 1;
/// id for the `short` primitive.
pub const SHORT_ID: i32 = 2;
/// id for the `int` primitive.
pub const INT_ID: i32 = 3;
/// id for the `long` primitive.
pub const LONG_ID: i32 = 4;
/// The first id handed out to a user-declared struct.
pub const FIRST_STRUCT_ID: i32 = 5;

/// A value type: a primitive or struct identity, a pointer depth, a byte
/// size, and whether the value is represented as an address-in-register
/// (lvalue) rather than a value-in-register (rvalue).
///
/// `id`, `pointers`, and `lvalue` together form a total order so `DataType`
/// can be used as a map key: two keys are equal iff all three components
/// are componentwise equal, `lvalue` included.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DataType {
    pub id: i32,
    pub pointers: u32,
    pub size: u32,
    pub lvalue: bool,
}

impl DataType {
    pub const fn primitive(id: i32, size: u32) -> Self {
        DataType {
            id,
            pointers: 0,
            size,
            lvalue: false,
        }
    }

    pub const CHAR: DataType = DataType::primitive(CHAR_ID, 1);
    pub const SHORT: DataType = DataType::primitive(SHORT_ID, 2);
    pub const INT: DataType = DataType::primitive(INT_ID, 4);
    pub const LONG: DataType = DataType::primitive(LONG_ID, 8);

    /// True for `char`/`short`/`int`/`long` with no indirection: the types
    /// code paths distinguish from "struct or other" by testing `id <= 4`.
    pub fn is_primitive_integer(&self) -> bool {
        self.id <= LONG_ID && self.pointers == 0
    }

    pub fn is_struct(&self) -> bool {
        self.id >= FIRST_STRUCT_ID && self.pointers == 0
    }

    pub fn is_pointer(&self) -> bool {
        self.pointers > 0
    }

    /// Returns the lvalue form of this type: same id/pointers/size, flagged
    /// as an address-in-register.
    pub fn as_lvalue(&self) -> Self {
        DataType {
            lvalue: true,
            ..*self
        }
    }

    /// Returns the rvalue (collapsed) form of this type.
    pub fn as_rvalue(&self) -> Self {
        DataType {
            lvalue: false,
            ..*self
        }
    }

    /// One level of pointer indirection added, e.g. `int` -> `int*`. The
    /// pointee's size stays on record via the struct/size table the caller
    /// looked this type up from; pointers themselves are always 8 bytes.
    pub fn pointer_to(&self) -> Self {
        DataType {
            id: self.id,
            pointers: self.pointers + 1,
            size: 8,
            lvalue: false,
        }
    }

    /// One level of pointer indirection removed, e.g. `int*` -> `int`.
    /// `pointee_size` is the byte width of the referent, supplied by the
    /// caller (from the primitive table or a struct's size).
    pub fn dereferenced(&self, pointee_size: u32) -> Self {
        DataType {
            id: self.id,
            pointers: self.pointers - 1,
            size: pointee_size,
            lvalue: false,
        }
    }
}

impl Ord for DataType {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.id, self.pointers, self.lvalue).cmp(&(
            other.id,
            other.pointers,
            other.lvalue,
        ))
    }
}

impl PartialOrd for DataType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One field of a struct: its name, type, and byte offset from the base of
/// the struct.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub offset: u32,
}

/// A user-declared struct type. Fields are laid out at a fixed 8-byte
/// stride regardless of their individual widths; only the struct's total
/// size reflects that stride.
#[derive(Clone, Debug, PartialEq)]
pub struct Struct {
    pub name: String,
    pub id: i32,
    pub size: u32,
    pub fields: Vec<Field>,
}

impl Struct {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Registry of every struct declared so far, indexed both by id and by name.
/// Append-only during parsing, so a forward reference to a struct declared
/// later in the file still resolves.
#[derive(Debug, Default)]
pub struct StructTable {
    by_id: HashMap<i32, Struct>,
    by_name: HashMap<String, i32>,
    next_id: i32,
}

impl StructTable {
    pub fn new() -> Self {
        StructTable {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            next_id: FIRST_STRUCT_ID,
        }
    }

    /// Declares a new struct, assigning it the next sequential id. Field
    /// offsets are computed here at a fixed 8-byte stride.
    pub fn declare(
        &mut self,
        name: String,
        field_decls: Vec<(String, DataType)>,
    ) -> i32 {
        let id = self.next_id;
        self.next_id += 1;

        let fields: Vec<Field> = field_decls
            .into_iter()
            .enumerate()
            .map(|(i, (fname, data_type))| Field {
                name: fname,
                data_type,
                offset: (i as u32) * 8,
            })
            .collect();
        let size = (fields.len() as u32) * 8;

        self.by_name.insert(name.clone(), id);
        self.by_id.insert(
            id,
            Struct {
                name,
                id,
                size,
                fields,
            },
        );
        id
    }

    pub fn by_name(&self, name: &str) -> Option<&Struct> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    pub fn by_id(&self, id: i32) -> Option<&Struct> {
        self.by_id.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total_and_includes_lvalue() {
        let int_rvalue = DataType::INT;
        let int_lvalue = DataType::INT.as_lvalue();
        assert_ne!(int_rvalue, int_lvalue);
        assert!(int_rvalue < int_lvalue);
        assert!(!(int_rvalue < int_rvalue) && !(int_rvalue > int_rvalue));
    }

    #[test]
    fn ordering_by_id_then_pointers() {
        assert!(DataType::CHAR < DataType::SHORT);
        assert!(DataType::SHORT < DataType::INT);
        assert!(DataType::INT < DataType::LONG);
        assert!(DataType::INT < DataType::INT.pointer_to());
    }

    #[test]
    fn struct_fields_get_eight_byte_stride() {
        let mut structs = StructTable::new();
        let id = structs.declare(
            "Point".into(),
            vec![
                ("x".into(), DataType::CHAR),
                ("y".into(), DataType::LONG),
            ],
        );
        let s = structs.by_id(id).unwrap();
        assert_eq!(s.size, 16);
        assert_eq!(s.field("x").unwrap().offset, 0);
        assert_eq!(s.field("y").unwrap().offset, 8);
        // real width used for the field's own type, not for the stride
        assert_eq!(s.field("x").unwrap().data_type.size, 1);
    }

    #[test]
    fn primitive_vs_struct_or_other() {
        assert!(DataType::INT.is_primitive_integer());
        assert!(!DataType::INT.pointer_to().is_primitive_integer());
        let struct_type = DataType {
            id: FIRST_STRUCT_ID,
            pointers: 0,
            size: 8,
            lvalue: false,
        };
        assert!(!struct_type.is_primitive_integer());
        assert!(struct_type.is_struct());
    }
}
