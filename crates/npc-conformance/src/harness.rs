//! The three C programs run against the library for every case.

use crate::cgen::{Directive, Expr, Program, Stmt};
use crate::matrix::TestCase;
use npc_dtype::{ByteOrder, DType};
use npc_ndarray::MemoryOrder;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessVariant {
    /// Open the reference file, check it, copy it through a second array.
    DecodeReencode,
    /// Create and fill an array with no input file.
    CreateFromScratch,
    /// Re-open the from-scratch output and check it.
    ReopenVerify,
}

impl HarnessVariant {
    pub const ALL: [Self; 3] = [
        Self::DecodeReencode,
        Self::CreateFromScratch,
        Self::ReopenVerify,
    ];

    #[must_use]
    pub const fn number(self) -> usize {
        match self {
            Self::DecodeReencode => 1,
            Self::CreateFromScratch => 2,
            Self::ReopenVerify => 3,
        }
    }

    #[must_use]
    pub fn program_name(self) -> String {
        format!("test{}", self.number())
    }
}

/// Library names for one dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CBinding {
    pub tag: &'static str,
    pub c_type: &'static str,
    pub accessor: &'static str,
}

#[must_use]
pub const fn binding(dtype: DType) -> CBinding {
    let (tag, c_type, accessor) = match dtype {
        DType::Bool => ("CNPY_B", "bool", "b"),
        DType::I8 => ("CNPY_I1", "int8_t", "i1"),
        DType::I16 => ("CNPY_I2", "int16_t", "i2"),
        DType::I32 => ("CNPY_I4", "int32_t", "i4"),
        DType::I64 => ("CNPY_I8", "int64_t", "i8"),
        DType::U8 => ("CNPY_U1", "uint8_t", "u1"),
        DType::U16 => ("CNPY_U2", "uint16_t", "u2"),
        DType::U32 => ("CNPY_U4", "uint32_t", "u4"),
        DType::U64 => ("CNPY_U8", "uint64_t", "u8"),
        DType::F32 => ("CNPY_F4", "float", "f4"),
        DType::F64 => ("CNPY_F8", "double", "f8"),
        DType::Complex64 => ("CNPY_C8", "complex float", "c8"),
        DType::Complex128 => ("CNPY_C16", "complex double", "c16"),
    };
    CBinding {
        tag,
        c_type,
        accessor,
    }
}

#[must_use]
pub const fn byte_order_tag(order: ByteOrder) -> &'static str {
    match order {
        ByteOrder::Little => "CNPY_LE",
        ByteOrder::Big => "CNPY_BE",
        ByteOrder::NotApplicable => "CNPY_NE",
    }
}

#[must_use]
pub const fn layout_tag(layout: MemoryOrder) -> &'static str {
    match layout {
        MemoryOrder::C => "CNPY_C_ORDER",
        MemoryOrder::F => "CNPY_FORTRAN_ORDER",
    }
}

/// Fixed artifact names inside the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPaths {
    dir: PathBuf,
}

impl ScratchPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reference encoding of the case.
    #[must_use]
    pub fn reference(&self) -> PathBuf {
        self.dir.join("1.npy")
    }

    /// Library re-encoding of the reference file.
    #[must_use]
    pub fn reencoded(&self) -> PathBuf {
        self.dir.join("2.npy")
    }

    /// Library encoding built from scratch.
    #[must_use]
    pub fn from_scratch(&self) -> PathBuf {
        self.dir.join("3.npy")
    }

    #[must_use]
    pub fn source(&self, variant: HarnessVariant) -> PathBuf {
        self.dir.join(format!("{}.c", variant.program_name()))
    }

    #[must_use]
    pub fn binary(&self, variant: HarnessVariant) -> PathBuf {
        self.dir.join(variant.program_name())
    }

    /// Everything a case may leave behind.
    #[must_use]
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = (1..=4)
            .map(|n| self.dir.join(format!("{n}.npy")))
            .collect();
        paths.extend(HarnessVariant::ALL.map(|variant| self.source(variant)));
        paths.extend(HarnessVariant::ALL.map(|variant| self.binary(variant)));
        paths
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessProgram {
    pub variant: HarnessVariant,
    pub source: String,
}

fn path_literal(path: &Path) -> Expr {
    Expr::string(path.to_string_lossy())
}

fn success(call: Expr) -> Stmt {
    Stmt::Assert(call.equals(Expr::ident("CNPY_SUCCESS")))
}

fn metadata_asserts(case: &TestCase, array: &str) -> Vec<Stmt> {
    let field = |name: &str| Expr::ident(array).member(name);
    let mut stmts = vec![
        Stmt::Assert(field("byte_order").equals(Expr::ident(byte_order_tag(case.byte_order())))),
        Stmt::Assert(field("dtype").equals(Expr::ident(binding(case.dtype()).tag))),
        Stmt::Assert(field("order").equals(Expr::ident(layout_tag(case.layout())))),
        Stmt::Assert(field("n_dim").equals(Expr::Int(case.rank() as u64))),
    ];
    stmts.extend(case.shape().iter().enumerate().map(|(axis, &extent)| {
        Stmt::Assert(
            field("dims")
                .index(Expr::Int(axis as u64))
                .equals(Expr::Int(extent as u64)),
        )
    }));
    stmts
}

/// `index`/`i` declarations, a do-while over `array` and the final count check.
fn cursor_walk(case: &TestCase, array: &str, body: Vec<Stmt>) -> Vec<Stmt> {
    vec![
        Stmt::Blank,
        Stmt::decl_array("size_t", "index", Expr::ident("CNPY_MAX_DIM")),
        Stmt::Expr(Expr::call(
            "cnpy_reset_index",
            vec![Expr::ident(array), Expr::ident("index")],
        )),
        Stmt::decl_init("size_t", "i", Expr::Int(0)),
        Stmt::DoWhile {
            body,
            cond: Expr::call(
                "cnpy_next_index",
                vec![Expr::ident(array), Expr::ident("index")],
            ),
        },
        Stmt::Assert(Expr::ident("i").equals(Expr::Int(case.element_count() as u64))),
    ]
}

fn read_and_check(case: &TestCase, array: &str) -> Vec<Stmt> {
    let CBinding {
        c_type, accessor, ..
    } = binding(case.dtype());
    vec![
        Stmt::decl_init(
            c_type,
            "x",
            Expr::call(
                format!("cnpy_get_{accessor}"),
                vec![Expr::ident(array), Expr::ident("index")],
            ),
        ),
        Stmt::Assert(Expr::ident("x").equals(Expr::ident("i").cast(c_type))),
    ]
}

fn increment() -> Stmt {
    Stmt::AddAssign(Expr::ident("i"), Expr::Int(1))
}

fn decode_reencode(case: &TestCase, paths: &ScratchPaths) -> Vec<Stmt> {
    let accessor = binding(case.dtype()).accessor;
    let a_in = || Expr::ident("a_in");
    let mut body = vec![
        Stmt::decl("cnpy_array", "a_in"),
        Stmt::decl("cnpy_array", "a_out"),
        success(Expr::call(
            "cnpy_open",
            vec![
                path_literal(&paths.reference()),
                Expr::Bool(false),
                a_in().addr_of(),
            ],
        )),
        success(Expr::call(
            "cnpy_create",
            vec![
                path_literal(&paths.reencoded()),
                a_in().member("byte_order"),
                a_in().member("dtype"),
                a_in().member("order"),
                a_in().member("n_dim"),
                a_in().member("dims"),
                Expr::ident("a_out").addr_of(),
            ],
        )),
        Stmt::Blank,
    ];
    body.extend(metadata_asserts(case, "a_in"));
    body.push(Stmt::Blank);
    body.extend(metadata_asserts(case, "a_out"));

    let mut loop_body = read_and_check(case, "a_in");
    loop_body.push(Stmt::Expr(Expr::call(
        format!("cnpy_set_{accessor}"),
        vec![Expr::ident("a_out"), Expr::ident("index"), Expr::ident("x")],
    )));
    loop_body.push(increment());
    body.extend(cursor_walk(case, "a_in", loop_body));
    body
}

fn create_from_scratch(case: &TestCase, paths: &ScratchPaths) -> Vec<Stmt> {
    let CBinding {
        tag,
        c_type,
        accessor,
    } = binding(case.dtype());
    let mut body = vec![
        Stmt::decl("cnpy_array", "a_out"),
        Stmt::decl_array("size_t", "dims", Expr::ident("CNPY_MAX_DIM")),
    ];
    body.extend(case.shape().iter().enumerate().map(|(axis, &extent)| {
        Stmt::Assign(
            Expr::ident("dims").index(Expr::Int(axis as u64)),
            Expr::Int(extent as u64),
        )
    }));
    body.push(success(Expr::call(
        "cnpy_create",
        vec![
            path_literal(&paths.from_scratch()),
            Expr::ident(byte_order_tag(case.byte_order())),
            Expr::ident(tag),
            Expr::ident(layout_tag(case.layout())),
            Expr::Int(case.rank() as u64),
            Expr::ident("dims"),
            Expr::ident("a_out").addr_of(),
        ],
    )));
    body.push(Stmt::Blank);
    body.extend(metadata_asserts(case, "a_out"));

    let loop_body = vec![
        Stmt::Expr(Expr::call(
            format!("cnpy_set_{accessor}"),
            vec![
                Expr::ident("a_out"),
                Expr::ident("index"),
                Expr::ident("i").cast(c_type),
            ],
        )),
        increment(),
    ];
    body.extend(cursor_walk(case, "a_out", loop_body));
    body
}

fn reopen_verify(case: &TestCase, paths: &ScratchPaths) -> Vec<Stmt> {
    let mut body = vec![
        Stmt::decl("cnpy_array", "a_in"),
        success(Expr::call(
            "cnpy_open",
            vec![
                path_literal(&paths.from_scratch()),
                Expr::Bool(false),
                Expr::ident("a_in").addr_of(),
            ],
        )),
        Stmt::Blank,
    ];
    body.extend(metadata_asserts(case, "a_in"));

    let mut loop_body = read_and_check(case, "a_in");
    loop_body.push(increment());
    body.extend(cursor_walk(case, "a_in", loop_body));
    body
}

/// Emits the C source of `variant` for `case`, with file paths under `paths`.
#[must_use]
pub fn generate(case: &TestCase, variant: HarnessVariant, paths: &ScratchPaths) -> HarnessProgram {
    let main_body = match variant {
        HarnessVariant::DecodeReencode => decode_reencode(case, paths),
        HarnessVariant::CreateFromScratch => create_from_scratch(case, paths),
        HarnessVariant::ReopenVerify => reopen_verify(case, paths),
    };
    let program = Program {
        directives: vec![
            // Assertions are the pass/fail signal; user CFLAGS must not disable them.
            Directive::Undef("NDEBUG".to_string()),
            Directive::SystemInclude("stdio.h".to_string()),
            Directive::SystemInclude("assert.h".to_string()),
            Directive::LocalInclude("cnpy.h".to_string()),
        ],
        main_body,
    };
    HarnessProgram {
        variant,
        source: program.render(),
    }
}
