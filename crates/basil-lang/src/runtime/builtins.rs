/// Dispatch keys for the built-in function surface. Each key is bound into
/// the global table under its source-level name at session start; the
/// implementations live in the interpreter, which owns the host handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    PrintRet,
    Input,
    InputInt,
    Clear,
    IsNumber,
    IsString,
    IsList,
    IsFunction,
    Append,
    Pop,
    Extend,
    Len,
    Run,
}

impl Builtin {
    pub fn all() -> &'static [(&'static str, Builtin)] {
        &[
            ("print", Builtin::Print),
            ("print_ret", Builtin::PrintRet),
            ("input", Builtin::Input),
            ("input_int", Builtin::InputInt),
            ("clear", Builtin::Clear),
            ("is_number", Builtin::IsNumber),
            ("is_string", Builtin::IsString),
            ("is_list", Builtin::IsList),
            ("is_function", Builtin::IsFunction),
            ("append", Builtin::Append),
            ("pop", Builtin::Pop),
            ("extend", Builtin::Extend),
            ("len", Builtin::Len),
            ("run", Builtin::Run),
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print      => "print",
            Builtin::PrintRet   => "print_ret",
            Builtin::Input      => "input",
            Builtin::InputInt   => "input_int",
            Builtin::Clear      => "clear",
            Builtin::IsNumber   => "is_number",
            Builtin::IsString   => "is_string",
            Builtin::IsList     => "is_list",
            Builtin::IsFunction => "is_function",
            Builtin::Append     => "append",
            Builtin::Pop        => "pop",
            Builtin::Extend     => "extend",
            Builtin::Len        => "len",
            Builtin::Run        => "run",
        }
    }

    /// Positional parameter names; arity is checked exactly before binding.
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Builtin::Print | Builtin::PrintRet => &["value"],
            Builtin::Input | Builtin::InputInt | Builtin::Clear => &[],
            Builtin::IsNumber | Builtin::IsString | Builtin::IsList | Builtin::IsFunction => {
                &["value"]
            }
            Builtin::Append => &["list", "value"],
            Builtin::Pop => &["list", "index"],
            Builtin::Extend => &["listA", "listB"],
            Builtin::Len => &["list"],
            Builtin::Run => &["fn"],
        }
    }
}
