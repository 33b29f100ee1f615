//! Pseudo-code rendering of a tree, for tests and `cdep dump`.

use std::collections::BTreeSet;

use crate::ast::{Arena, Constant, ExprId, Expression, FindModule, ModuleArchive};
use crate::core::Coordinate;
use crate::util::text::{join_on, safe_format};
use crate::visit::readonly::{walk, Visitor};

/// Render `id` as indented pseudo-code with surrounding blank lines trimmed.
pub fn to_pseudo_code(arena: &Arena, id: ExprId) -> String {
    let mut printer = Printer::default();
    printer.visit(arena, id);
    printer.out.trim_matches(|c| c == '\n' || c == '\r').to_string()
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn newline(&mut self) {
        self.out.push('\n');
    }

    /// End the current line unless it is already empty.
    fn break_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.newline();
        }
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn line(&mut self, text: &str) {
        self.pad();
        self.out.push_str(text);
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Render `id` inline into its own buffer.
    fn capture(&mut self, arena: &Arena, id: ExprId) -> String {
        let saved = std::mem::take(&mut self.out);
        self.visit(arena, id);
        std::mem::replace(&mut self.out, saved)
    }

    fn list(&mut self, arena: &Arena, ids: &[ExprId]) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.visit(arena, *id);
        }
    }
}

impl Visitor for Printer {
    fn visit_find_module(&mut self, arena: &Arena, _id: ExprId, find: &FindModule) {
        self.break_line();
        self.line(&format!("find({})", find.coordinate));
        self.indent += 1;
        self.visit(arena, find.body);
        self.indent -= 1;
        self.break_line();
        self.line("end_find");
        self.break_line();
    }

    fn visit_if_switch(
        &mut self,
        arena: &Arena,
        _id: ExprId,
        conditions: &[ExprId],
        branches: &[ExprId],
        otherwise: ExprId,
    ) {
        self.break_line();
        self.pad();
        for (condition, branch) in conditions.iter().zip(branches) {
            self.push("if(");
            self.visit(arena, *condition);
            self.push(") ");
            self.indent += 1;
            self.visit(arena, *branch);
            self.indent -= 1;
            self.break_line();
            self.line("else ");
        }
        self.indent += 1;
        self.visit(arena, otherwise);
        self.indent -= 1;
        self.break_line();
        if !conditions.is_empty() {
            self.line("end_if");
            self.break_line();
        }
    }

    fn visit_module(
        &mut self,
        arena: &Arena,
        _id: ExprId,
        archive: ExprId,
        _dependencies: &BTreeSet<Coordinate>,
    ) {
        self.break_line();
        self.line("module");
        self.break_line();
        self.indent += 1;
        self.visit(arena, archive);
        self.indent -= 1;
        self.line("end_module");
    }

    fn visit_module_archive(&mut self, arena: &Arena, _id: ExprId, archive: &ModuleArchive) {
        if let Some(include) = archive.include_path {
            self.line("include: ");
            self.visit(arena, include);
            self.break_line();
        }
        if !archive.library_paths.is_empty() {
            self.line("libraries: [");
            self.list(arena, &archive.library_paths);
            self.push("]");
            self.break_line();
        }
        self.line(&format!("requires: {}", join_on(", ", &archive.requires)));
        self.break_line();
    }

    fn visit_assignment(&mut self, arena: &Arena, _id: ExprId, name: &str, value: ExprId) {
        self.break_line();
        self.line(&format!("var {} = ", name));
        self.visit(arena, value);
    }

    fn visit_assignment_reference(&mut self, arena: &Arena, _id: ExprId, assignment: ExprId) {
        let name = arena.assignment_name(assignment).unwrap_or("?");
        self.push(&format!("*{}", name));
    }

    fn visit_abort(&mut self, arena: &Arena, _id: ExprId, message: &str, args: &[ExprId]) {
        let args: Vec<String> = args.iter().map(|arg| self.capture(arena, *arg)).collect();
        self.break_line();
        self.line(&format!("abort {}", safe_format(message, &args)));
    }

    fn visit_other(&mut self, arena: &Arena, id: ExprId) {
        match arena.get(id) {
            Expression::Constant(Constant::String(value)) => self.push(&format!("'{}'", value)),
            Expression::Constant(constant) => self.push(&format!("'{}'", constant)),
            Expression::Parameter { name } => self.push(name),
            Expression::InvokeBuiltin { function, args } => {
                self.push(function.name());
                self.push("(");
                self.list(arena, args);
                self.push(")");
            }
            Expression::Array(elements) => {
                self.push("[");
                self.list(arena, elements);
                self.push("]");
            }
            Expression::GlobalEnv(globals) => {
                for parameter in globals.parameters() {
                    if let Expression::Parameter { name } = arena.get(parameter) {
                        self.push(&format!("import {}\n", name));
                    }
                }
            }
            _ => walk(self, arena, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::GlobalEnv;

    #[test]
    fn test_if_switch_rendering() {
        let mut arena = Arena::new();
        let globals = GlobalEnv::alloc(&mut arena);
        let linux = arena.string("Linux");
        let condition = arena.eq(globals.target_system, linux);
        let branch = arena.abort("linux", Vec::new());
        let otherwise = arena.abort("Target platform %s is not supported", vec![globals.target_system]);
        let switch = arena.if_switch(vec![condition], vec![branch], otherwise);

        let expected = "if(eq(build_system_target_system, 'Linux')) \n  abort linux\nelse \n  abort Target platform build_system_target_system is not supported\nend_if";
        assert_eq!(to_pseudo_code(&arena, switch), expected);
    }

    #[test]
    fn test_statement_after_if_switch_starts_a_new_line() {
        let mut arena = Arena::new();
        let condition = arena.boolean(true);
        let branch = arena.abort("a", Vec::new());
        let otherwise = arena.abort("b", Vec::new());
        let switch = arena.if_switch(vec![condition], vec![branch], otherwise);
        let after = arena.abort("c", Vec::new());
        let multi = arena.multi(vec![switch, after]);

        assert_eq!(
            to_pseudo_code(&arena, multi),
            "if('true') \n  abort a\nelse \n  abort b\nend_if\nabort c"
        );
    }

    #[test]
    fn test_assignment_and_reference_rendering() {
        let mut arena = Arena::new();
        let globals = GlobalEnv::alloc(&mut arena);
        let name = arena.file_get_name(globals.osx_sysroot);
        let name = arena.assign("osx_sysroot_sdk_name", name);
        let reference = arena.reference(name);
        let dot = arena.last_index_of(reference, ".");
        let body = arena.abort("%s", vec![dot]);
        let block = arena.assignment_block(vec![name], body);

        let printed = to_pseudo_code(&arena, block);
        assert_eq!(
            printed,
            "var osx_sysroot_sdk_name = getName(CMAKE_OSX_SYSROOT)\nabort lastIndexOf(*osx_sysroot_sdk_name, '.')"
        );
    }

    #[test]
    fn test_module_rendering() {
        let mut arena = Arena::new();
        let include = arena.string("/root/include");
        let lib = arena.string("/root/lib/libz.a");
        let archive = arena.archive(
            url::Url::parse("https://example.com/zlib.zip").unwrap(),
            "abc",
            10,
            Some("include".to_string()),
            Some(include),
            vec!["lib/libz.a".to_string()],
            vec![lib],
            Vec::new(),
        );
        let module = arena.module(archive, BTreeSet::new());

        assert_eq!(
            to_pseudo_code(&arena, module),
            "module\n  include: '/root/include'\n  libraries: ['/root/lib/libz.a']\n  requires: \nend_module"
        );
    }
}
