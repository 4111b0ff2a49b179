//! Method identity resolution.
//!
//! The dumper never parses bytecode files itself; it asks a
//! [`SymbolResolver`] for display strings. [`SymbolTable`] is the in-memory
//! implementation used by listings and tests.

use std::fmt;

use hashbrown::HashMap;

/// Opaque method index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method@{}", self.0)
    }
}

/// Resolves opaque method ids to display strings.
pub trait SymbolResolver {
    /// Human-readable `ret Class.name(params)` form.
    fn pretty_method(&self, method: MethodId) -> String;

    fn method_name(&self, method: MethodId) -> String;

    /// Signature in descriptor form, e.g. `(II)V`.
    fn method_signature(&self, method: MethodId) -> String;

    /// Declaring class in descriptor form, e.g. `Lcom/example/Foo;`.
    fn declaring_class_descriptor(&self, method: MethodId) -> String;
}

/// Descriptor-level description of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSymbol {
    pub class_descriptor: String,
    pub name: String,
    pub signature: String,
}

/// Map-backed [`SymbolResolver`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    methods: HashMap<MethodId, MethodSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: MethodId, symbol: MethodSymbol) {
        self.methods.insert(method, symbol);
    }

    pub fn get(&self, method: MethodId) -> Option<&MethodSymbol> {
        self.methods.get(&method)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn pretty_method(&self, method: MethodId) -> String {
        match self.get(method) {
            Some(sym) => {
                let (params, ret) = split_signature(&sym.signature);
                let params: Vec<String> = params.iter().map(|p| pretty_descriptor(p)).collect();
                format!(
                    "{} {}.{}({})",
                    pretty_descriptor(ret),
                    pretty_descriptor(&sym.class_descriptor),
                    sym.name,
                    params.join(", ")
                )
            }
            None => format!("<<unknown {method}>>"),
        }
    }

    fn method_name(&self, method: MethodId) -> String {
        self.get(method)
            .map(|sym| sym.name.clone())
            .unwrap_or_else(|| format!("{method}"))
    }

    fn method_signature(&self, method: MethodId) -> String {
        self.get(method)
            .map(|sym| sym.signature.clone())
            .unwrap_or_default()
    }

    fn declaring_class_descriptor(&self, method: MethodId) -> String {
        self.get(method)
            .map(|sym| sym.class_descriptor.clone())
            .unwrap_or_default()
    }
}

/// Turns a type descriptor into source form: `[Ljava/lang/String;` -> `java.lang.String[]`.
pub fn pretty_descriptor(descriptor: &str) -> String {
    let dims = descriptor.bytes().take_while(|&b| b == b'[').count();
    let element = &descriptor[dims..];
    let base = match element {
        "V" => "void".to_string(),
        "Z" => "boolean".to_string(),
        "B" => "byte".to_string(),
        "S" => "short".to_string(),
        "C" => "char".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "F" => "float".to_string(),
        "D" => "double".to_string(),
        _ => match element.strip_prefix('L').and_then(|e| e.strip_suffix(';')) {
            Some(class) => class.replace('/', "."),
            None => element.to_string(),
        },
    };
    format!("{base}{}", "[]".repeat(dims))
}

/// Splits `(params)ret` into parameter descriptors and the return descriptor.
fn split_signature(signature: &str) -> (Vec<&str>, &str) {
    let Some(rest) = signature.strip_prefix('(') else {
        return (Vec::new(), signature);
    };
    let Some(close) = rest.find(')') else {
        return (Vec::new(), signature);
    };
    let (mut params, ret) = (&rest[..close], &rest[close + 1..]);

    let mut out = Vec::new();
    while !params.is_empty() {
        let dims = params.bytes().take_while(|&b| b == b'[').count();
        let len = match params.as_bytes().get(dims) {
            Some(b'L') => params[dims..].find(';').map_or(params.len() - dims, |i| i + 1),
            Some(_) => params[dims..].chars().next().map_or(0, char::len_utf8),
            None => 0,
        };
        let (param, rest) = params.split_at(dims + len);
        out.push(param);
        params = rest;
    }
    (out, ret)
}
