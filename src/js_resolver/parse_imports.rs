use oxc_allocator::Allocator;
use oxc_ast::{
    ast::{
        ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration,
        ImportExpression, StringLiteral, TSImportEqualsDeclaration, TSModuleReference,
    },
    visit::{walk, Visit},
};
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

#[derive(Default)]
pub struct Imports<'a> {
    /// Literal specifiers in source order.
    pub specifiers: Vec<(&'a str, Span)>,
    pub non_literal_imports: Vec<Span>,
}

impl<'a> Imports<'a> {
    fn literal(&mut self, literal: &StringLiteral<'a>) {
        self.specifiers.push((literal.value.as_str(), literal.span));
    }

    fn into_source_order(mut self) -> Self {
        self.specifiers.sort_by_key(|(_, span)| span.start);
        self.non_literal_imports.sort_by_key(|span| span.start);
        self
    }
}

/// The parser gave up on the module, so its imports are unknown.
#[derive(Debug)]
pub struct Unparsable(pub Vec<OxcDiagnostic>);

impl<'a> Visit<'a> for Imports<'a> {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        if !decl.import_kind.is_type() {
            self.literal(&decl.source);
        }
        walk::walk_import_declaration(self, decl);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        match &decl.source {
            Some(source) if !decl.export_kind.is_type() => self.literal(source),
            _ => {}
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        if !decl.export_kind.is_type() {
            self.literal(&decl.source);
        }
        walk::walk_export_all_declaration(self, decl);
    }

    fn visit_ts_import_equals_declaration(&mut self, decl: &TSImportEqualsDeclaration<'a>) {
        if let TSModuleReference::ExternalModuleReference(reference) = &decl.module_reference {
            if !decl.import_kind.is_type() {
                self.literal(&reference.expression);
            }
        }
        walk::walk_ts_import_equals_declaration(self, decl);
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        match &expr.source {
            Expression::StringLiteral(literal) => self.literal(literal),
            source => self.non_literal_imports.push(source.span()),
        }
        walk::walk_import_expression(self, expr);
    }
}

/// Collects ES module import specifiers. Type-only imports and exports are
/// skipped, and so are CommonJS `require` calls. Diagnostics the parser
/// recovered from are returned next to the imports.
pub fn parse_imports<'a>(
    allocator: &'a Allocator,
    source_type: SourceType,
    source: &'a str,
) -> Result<(Imports<'a>, Vec<OxcDiagnostic>), Unparsable> {
    let parse_return = Parser::new(allocator, source, source_type).parse();
    if parse_return.panicked {
        return Err(Unparsable(parse_return.errors));
    }
    let mut imports = Imports::default();
    walk::walk_program(&mut imports, &parse_return.program);
    // `a` in `a.then(b)` is visited after `b`
    Ok((imports.into_source_order(), parse_return.errors))
}
