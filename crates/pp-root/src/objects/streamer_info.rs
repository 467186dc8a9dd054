//! The `StreamerInfo` record: a `TList` of `TStreamerInfo` describing the
//! on-disk layout of every class the writer streams.
//!
//! Only the classes reachable from the histogram classes written to a file
//! are described. Layouts match the class versions used by
//! [`th_writer`](super::th_writer).

use std::collections::BTreeSet;

use crate::error::{Result, RootError};
use crate::histogram::ContentType;
use crate::wbuffer::{ClassTags, WBuffer};

/// Name of the key holding the list.
pub const STREAMER_INFO_NAME: &str = "StreamerInfo";
/// Title of that key.
pub const STREAMER_INFO_TITLE: &str = "Doubly linked list";
/// Class of that key.
pub const STREAMER_INFO_CLASS: &str = "TList";

const TLIST_VERSION: u16 = 5;
const TOBJARRAY_VERSION: u16 = 3;
const TSTREAMERINFO_VERSION: u16 = 9;
const TSTREAMERELEMENT_VERSION: u16 = 4;

// TVirtualStreamerInfo::EReadWrite
const K_BASE: i32 = 0;
const K_CHAR: i32 = 1;
const K_SHORT: i32 = 2;
const K_INT: i32 = 3;
const K_FLOAT: i32 = 5;
const K_DOUBLE: i32 = 8;
const K_USHORT: i32 = 12;
const K_UINT: i32 = 13;
const K_BITS: i32 = 15;
const K_BOOL: i32 = 18;
const K_OFFSET_P: i32 = 40;
const K_OBJECT: i32 = 61;
const K_ANY: i32 = 62;
const K_OBJECT_P_NOT_NULL: i32 = 63;
const K_OBJECT_P: i32 = 64;
const K_TSTRING: i32 = 65;
const K_TOBJECT: i32 = 66;
const K_TNAMED: i32 = 67;

/// `sizeof` of the members ROOT records in element sizes (64-bit build).
const SIZEOF_TSTRING: i32 = 24;
const SIZEOF_TARRAY_X: i32 = 24;
const SIZEOF_TAXIS: i32 = 216;
const SIZEOF_POINTER: i32 = 8;

#[derive(Debug, Clone, PartialEq)]
enum ElementKind {
    Base { version: i32 },
    Basic,
    BasicPointer { count_name: &'static str, count_class: &'static str, count_version: i32 },
    Object,
    ObjectAny,
    ObjectPointer,
    String,
}

impl ElementKind {
    fn class_name(&self) -> &'static str {
        match self {
            ElementKind::Base { .. } => "TStreamerBase",
            ElementKind::Basic => "TStreamerBasicType",
            ElementKind::BasicPointer { .. } => "TStreamerBasicPointer",
            ElementKind::Object => "TStreamerObject",
            ElementKind::ObjectAny => "TStreamerObjectAny",
            ElementKind::ObjectPointer => "TStreamerObjectPointer",
            ElementKind::String => "TStreamerString",
        }
    }

    fn class_version(&self) -> u16 {
        match self {
            ElementKind::Base { .. } => 3,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    kind: ElementKind,
    name: &'static str,
    title: &'static str,
    type_code: i32,
    size: i32,
    type_name: &'static str,
}

/// Layout of one class at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLayout {
    name: String,
    version: i32,
    elements: Vec<Element>,
}

impl ClassLayout {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class version described.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Class checksum derived from the element list.
    ///
    /// Follows `TStreamerInfo::GetCheckSum`: the class name, the base names,
    /// then each member's name, type name and array count, folded with
    /// `id = id * 3 + c`.
    pub fn checksum(&self) -> u32 {
        fn fold(id: &mut u32, s: &str) {
            for b in s.bytes() {
                *id = id.wrapping_mul(3).wrapping_add(b as u32);
            }
        }
        let mut id = 0u32;
        fold(&mut id, &self.name);
        for el in self.elements.iter().filter(|e| matches!(e.kind, ElementKind::Base { .. })) {
            fold(&mut id, el.name);
        }
        for el in self.elements.iter().filter(|e| !matches!(e.kind, ElementKind::Base { .. })) {
            fold(&mut id, el.name);
            fold(&mut id, el.type_name);
            if let ElementKind::BasicPointer { count_name, .. } = el.kind {
                fold(&mut id, count_name);
            }
        }
        id
    }

    /// Classes this layout depends on, in element order.
    fn dependencies(&self) -> Vec<&'static str> {
        self.elements
            .iter()
            .filter_map(|e| match e.kind {
                ElementKind::Base { .. } | ElementKind::Object | ElementKind::ObjectAny => {
                    Some(e.name_of_class())
                }
                _ => None,
            })
            .collect()
    }
}

impl Element {
    fn name_of_class(&self) -> &'static str {
        match self.kind {
            ElementKind::Base { .. } => self.name,
            _ => self.type_name,
        }
    }
}

fn base(name: &'static str, version: i32, title: &'static str) -> Element {
    let type_code = match name {
        "TObject" => K_TOBJECT,
        "TNamed" => K_TNAMED,
        _ => K_BASE,
    };
    Element {
        kind: ElementKind::Base { version },
        name,
        title,
        type_code,
        size: 0,
        type_name: "BASE",
    }
}

fn basic(name: &'static str, title: &'static str, type_code: i32, type_name: &'static str) -> Element {
    let size = match type_code {
        K_CHAR | K_BOOL => 1,
        K_SHORT | K_USHORT => 2,
        K_DOUBLE => 8,
        _ => 4,
    };
    Element { kind: ElementKind::Basic, name, title, type_code, size, type_name }
}

fn member(kind: ElementKind, name: &'static str, title: &'static str, type_name: &'static str) -> Element {
    let (type_code, size) = match kind {
        ElementKind::Object => (K_OBJECT, SIZEOF_TAXIS),
        ElementKind::ObjectAny => (K_ANY, SIZEOF_TARRAY_X),
        ElementKind::String => (K_TSTRING, SIZEOF_TSTRING),
        _ => (K_OBJECT_P, SIZEOF_POINTER),
    };
    Element { kind, name, title, type_code, size, type_name }
}

fn object_pointer(name: &'static str, title: &'static str, type_name: &'static str, never_null: bool) -> Element {
    let mut el = member(ElementKind::ObjectPointer, name, title, type_name);
    if never_null {
        el.type_code = K_OBJECT_P_NOT_NULL;
    }
    el
}

fn counted(
    name: &'static str,
    title: &'static str,
    elem_code: i32,
    type_name: &'static str,
    count: (&'static str, &'static str, i32),
) -> Element {
    let (count_name, count_class, count_version) = count;
    Element {
        kind: ElementKind::BasicPointer { count_name, count_class, count_version },
        name,
        title,
        type_code: K_OFFSET_P + elem_code,
        size: SIZEOF_POINTER,
        type_name,
    }
}

fn layout(name: &str, version: i32, elements: Vec<Element>) -> ClassLayout {
    ClassLayout { name: name.to_string(), version, elements }
}

/// The layout of a class the writer streams, if known.
fn class_layout(name: &str) -> Option<ClassLayout> {
    let l = match name {
        "TObject" => layout(
            "TObject",
            1,
            vec![
                basic("fUniqueID", "object unique identifier", K_UINT, "unsigned int"),
                basic("fBits", "bit field status word", K_BITS, "unsigned int"),
            ],
        ),
        "TNamed" => layout(
            "TNamed",
            1,
            vec![
                base("TObject", 1, "Basic ROOT object"),
                member(ElementKind::String, "fName", "object identifier", "TString"),
                member(ElementKind::String, "fTitle", "object title", "TString"),
            ],
        ),
        "TAttLine" => layout(
            "TAttLine",
            2,
            vec![
                basic("fLineColor", "Line color", K_SHORT, "short"),
                basic("fLineStyle", "Line style", K_SHORT, "short"),
                basic("fLineWidth", "Line width", K_SHORT, "short"),
            ],
        ),
        "TAttFill" => layout(
            "TAttFill",
            2,
            vec![
                basic("fFillColor", "Fill area color", K_SHORT, "short"),
                basic("fFillStyle", "Fill area style", K_SHORT, "short"),
            ],
        ),
        "TAttMarker" => layout(
            "TAttMarker",
            2,
            vec![
                basic("fMarkerColor", "Marker color", K_SHORT, "short"),
                basic("fMarkerStyle", "Marker style", K_SHORT, "short"),
                basic("fMarkerSize", "Marker size", K_FLOAT, "float"),
            ],
        ),
        "TAtt3D" => layout("TAtt3D", 1, Vec::new()),
        "TAttAxis" => layout(
            "TAttAxis",
            4,
            vec![
                basic("fNdivisions", "Number of divisions(10000*n3 + 100*n2 + n1)", K_INT, "int"),
                basic("fAxisColor", "Color of the line axis", K_SHORT, "short"),
                basic("fLabelColor", "Color of labels", K_SHORT, "short"),
                basic("fLabelFont", "Font for labels", K_SHORT, "short"),
                basic("fLabelOffset", "Offset of labels", K_FLOAT, "float"),
                basic("fLabelSize", "Size of labels", K_FLOAT, "float"),
                basic("fTickLength", "Length of tick marks", K_FLOAT, "float"),
                basic("fTitleOffset", "Offset of axis title", K_FLOAT, "float"),
                basic("fTitleSize", "Size of axis title", K_FLOAT, "float"),
                basic("fTitleColor", "Color of axis title", K_SHORT, "short"),
                basic("fTitleFont", "Font for axis title", K_SHORT, "short"),
            ],
        ),
        "TAxis" => layout(
            "TAxis",
            10,
            vec![
                base("TNamed", 1, "The basis for a named object (name, title)"),
                base("TAttAxis", 4, "Axis attributes"),
                basic("fNbins", "Number of bins", K_INT, "int"),
                basic("fXmin", "low edge of first bin", K_DOUBLE, "double"),
                basic("fXmax", "upper edge of last bin", K_DOUBLE, "double"),
                member(ElementKind::ObjectAny, "fXbins", "Bin edges array in X", "TArrayD"),
                basic("fFirst", "First bin to display", K_INT, "int"),
                basic("fLast", "Last bin to display", K_INT, "int"),
                basic("fBits2", "Second bit status word", K_USHORT, "unsigned short"),
                basic("fTimeDisplay", "On/off displaying time values instead of numerics", K_BOOL, "bool"),
                member(ElementKind::String, "fTimeFormat", "Date&time format, ex: 09/12/99 12:34:00", "TString"),
                object_pointer("fLabels", "List of labels", "THashList*", false),
                object_pointer("fModLabs", "List of modified labels", "TList*", false),
            ],
        ),
        "TArray" => layout("TArray", 1, vec![basic("fN", "Number of array elements", K_INT, "int")]),
        "TArrayD" => array_layout("TArrayD", "[fN] Array of fN doubles", K_DOUBLE, "double*"),
        "TArrayF" => array_layout("TArrayF", "[fN] Array of fN floats", K_FLOAT, "float*"),
        "TArrayI" => array_layout("TArrayI", "[fN] Array of fN 32 bit integers", K_INT, "int*"),
        "TArrayS" => array_layout("TArrayS", "[fN] Array of fN shorts", K_SHORT, "short*"),
        "TArrayC" => array_layout("TArrayC", "[fN] Array of fN chars", K_CHAR, "char*"),
        "TH1" => layout(
            "TH1",
            8,
            vec![
                base("TNamed", 1, "The basis for a named object (name, title)"),
                base("TAttLine", 2, "Line attributes"),
                base("TAttFill", 2, "Fill area attributes"),
                base("TAttMarker", 2, "Marker attributes"),
                basic("fNcells", "Number of bins(1D), cells (2D) +U/Overflows", K_INT, "int"),
                member(ElementKind::Object, "fXaxis", "X axis descriptor", "TAxis"),
                member(ElementKind::Object, "fYaxis", "Y axis descriptor", "TAxis"),
                member(ElementKind::Object, "fZaxis", "Z axis descriptor", "TAxis"),
                basic("fBarOffset", "(1000*offset) for bar charts or legos", K_SHORT, "short"),
                basic("fBarWidth", "(1000*width) for bar charts or legos", K_SHORT, "short"),
                basic("fEntries", "Number of entries", K_DOUBLE, "double"),
                basic("fTsumw", "Total Sum of weights", K_DOUBLE, "double"),
                basic("fTsumw2", "Total Sum of squares of weights", K_DOUBLE, "double"),
                basic("fTsumwx", "Total Sum of weight*X", K_DOUBLE, "double"),
                basic("fTsumwx2", "Total Sum of weight*X*X", K_DOUBLE, "double"),
                basic("fMaximum", "Maximum value for plotting", K_DOUBLE, "double"),
                basic("fMinimum", "Minimum value for plotting", K_DOUBLE, "double"),
                basic("fNormFactor", "Normalization factor", K_DOUBLE, "double"),
                member(ElementKind::ObjectAny, "fContour", "Array to display contour levels", "TArrayD"),
                member(ElementKind::ObjectAny, "fSumw2", "Array of sum of squares of weights", "TArrayD"),
                member(ElementKind::String, "fOption", "Histogram options", "TString"),
                object_pointer("fFunctions", "->Pointer to list of functions (fits and user)", "TList*", true),
                basic("fBufferSize", "fBuffer size", K_INT, "int"),
                counted("fBuffer", "[fBufferSize] entry buffer", K_DOUBLE, "double*", ("fBufferSize", "TH1", 8)),
                basic("fBinStatErrOpt", "Option for bin statistical errors", K_INT, "TH1::EBinErrorOpt"),
                basic("fStatOverflows", "Per object flag to use under/overflows in statistics", K_INT, "TH1::EStatOverflows"),
            ],
        ),
        "TH2" => layout(
            "TH2",
            5,
            vec![
                base("TH1", 8, "1-Dim histogram base class"),
                basic("fScalefactor", "Scale factor", K_DOUBLE, "double"),
                basic("fTsumwy", "Total Sum of weight*Y", K_DOUBLE, "double"),
                basic("fTsumwy2", "Total Sum of weight*Y*Y", K_DOUBLE, "double"),
                basic("fTsumwxy", "Total Sum of weight*X*Y", K_DOUBLE, "double"),
            ],
        ),
        "TH3" => layout(
            "TH3",
            6,
            vec![
                base("TH1", 8, "1-Dim histogram base class"),
                base("TAtt3D", 1, "3D attributes"),
                basic("fTsumwy", "Total Sum of weight*Y", K_DOUBLE, "double"),
                basic("fTsumwy2", "Total Sum of weight*Y*Y", K_DOUBLE, "double"),
                basic("fTsumwxy", "Total Sum of weight*X*Y", K_DOUBLE, "double"),
                basic("fTsumwz", "Total Sum of weight*Z", K_DOUBLE, "double"),
                basic("fTsumwz2", "Total Sum of weight*Z*Z", K_DOUBLE, "double"),
                basic("fTsumwxz", "Total Sum of weight*X*Z", K_DOUBLE, "double"),
                basic("fTsumwyz", "Total Sum of weight*Y*Z", K_DOUBLE, "double"),
            ],
        ),
        other => return histogram_layout(other),
    };
    Some(l)
}

fn array_layout(name: &'static str, title: &'static str, elem_code: i32, type_name: &'static str) -> ClassLayout {
    layout(
        name,
        1,
        vec![
            base("TArray", 1, "Abstract array base class"),
            counted("fArray", title, elem_code, type_name, ("fN", "TArray", 1)),
        ],
    )
}

/// `TH{1,2,3}{F,D,I,S,C}`: the dimension base plus the content array.
fn histogram_layout(name: &str) -> Option<ClassLayout> {
    let (dim, content_type) = ContentType::parse_class_name(name)?;
    let (dim_base, base_version, base_title, version) = match dim {
        1 => ("TH1", 8, "1-Dim histogram base class", 3),
        2 => ("TH2", 5, "2-Dim histogram base class", 4),
        _ => ("TH3", 6, "3-Dim histogram base class", 4),
    };
    let (array, array_title) = match content_type {
        ContentType::F => ("TArrayF", "Array of floats"),
        ContentType::D => ("TArrayD", "Array of doubles"),
        ContentType::I => ("TArrayI", "Array of ints"),
        ContentType::S => ("TArrayS", "Array of shorts"),
        ContentType::C => ("TArrayC", "Array of chars"),
    };
    Some(layout(
        name,
        version,
        vec![base(dim_base, base_version, base_title), base(array, 1, array_title)],
    ))
}

/// Layouts for `class_names` and everything they depend on, each class once,
/// dependents before their dependencies.
pub fn layouts_for<'a>(class_names: impl IntoIterator<Item = &'a str>) -> Result<Vec<ClassLayout>> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<String> = class_names.into_iter().map(str::to_string).collect();
    stack.reverse();
    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let l = class_layout(&name).ok_or_else(|| RootError::UnsupportedClass(name.clone()))?;
        for dep in l.dependencies().into_iter().rev() {
            if !seen.contains(dep) {
                stack.push(dep.to_string());
            }
        }
        out.push(l);
    }
    Ok(out)
}

/// Serialize the `StreamerInfo` list for `layouts`, as the payload of a key
/// whose header is `key_len` bytes long.
pub fn write_streamer_info(layouts: &[ClassLayout], key_len: usize) -> Result<Vec<u8>> {
    let mut tags = ClassTags::new(key_len);
    let mut w = WBuffer::new();

    let list = w.begin_version(TLIST_VERSION);
    w.write_tobject(0);
    w.write_string("");
    w.write_i32(layouts.len() as i32);
    for l in layouts {
        write_class_info(&mut w, &mut tags, l)?;
        w.write_u8(0); // per-entry option string
    }
    w.end_version(list)?;

    Ok(w.into_inner())
}

fn write_class_info(w: &mut WBuffer, tags: &mut ClassTags, l: &ClassLayout) -> Result<()> {
    let obj = w.begin_tagged_object("TStreamerInfo", tags);
    let info = w.begin_version(TSTREAMERINFO_VERSION);
    w.write_tnamed(0, &l.name, "")?;
    w.write_u32(l.checksum());
    w.write_i32(l.version);

    let arr = w.begin_tagged_object("TObjArray", tags);
    let body = w.begin_version(TOBJARRAY_VERSION);
    w.write_tobject(0);
    w.write_string("");
    w.write_i32(l.elements.len() as i32);
    w.write_i32(0); // fLowerBound
    for el in &l.elements {
        write_element(w, tags, el)?;
    }
    w.end_version(body)?;
    w.end_version(arr)?;

    w.end_version(info)?;
    w.end_version(obj)
}

fn write_element(w: &mut WBuffer, tags: &mut ClassTags, el: &Element) -> Result<()> {
    let obj = w.begin_tagged_object(el.kind.class_name(), tags);
    let outer = w.begin_version(el.kind.class_version());

    let inner = w.begin_version(TSTREAMERELEMENT_VERSION);
    w.write_tnamed(0, el.name, el.title)?;
    w.write_i32(el.type_code);
    w.write_i32(el.size);
    w.write_i32(0); // fArrayLength
    w.write_i32(0); // fArrayDim
    for _ in 0..5 {
        w.write_i32(0); // fMaxIndex
    }
    w.write_string(el.type_name);
    w.end_version(inner)?;

    match &el.kind {
        ElementKind::Base { version } => w.write_i32(*version),
        ElementKind::BasicPointer { count_name, count_class, count_version } => {
            w.write_i32(*count_version);
            w.write_string(count_name);
            w.write_string(count_class);
        }
        _ => {}
    }

    w.end_version(outer)?;
    w.end_version(obj)
}
