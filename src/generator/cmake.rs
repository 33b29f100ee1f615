//! CMake generator.
//!
//! Emits `cdep-dependencies-config.cmake`: a fixed helper library, one
//! `add_cdep_<artifact>_dependency(target)` function per coordinate and
//! `add_all_cdep_dependencies(target)` calling all of them.

use std::path::PathBuf;

use tracing::debug;

use crate::ast::{Arena, Ast, Builtin, Constant, ExprId, Expression, FindModule, GlobalEnv, ModuleArchive};
use crate::core::Coordinate;
use crate::generator::{
    add_dependency_function_name, require_lowered, script_path, GenerateError, GeneratedFile,
    GeneratorEnvironment,
};
use crate::lower;
use crate::util::text::safe_format;

pub const CONFIG_FILE_NAME: &str = "cdep-dependencies-config.cmake";

const LIBRARY_FUNCTIONS: &str = r#"
# Raise the C++ standard of `target` to at least `standard`.
function(cdepRequireMinimumCxxCompilerStandard target standard)
  if(${standard} EQUAL 0)
    return()
  endif()
  get_target_property(cdep_current_standard ${target} CXX_STANDARD)
  if(NOT cdep_current_standard OR cdep_current_standard EQUAL 98 OR cdep_current_standard LESS ${standard})
    set_target_properties(${target} PROPERTIES CXX_STANDARD ${standard} CXX_STANDARD_REQUIRED ON)
  endif()
endfunction(cdepRequireMinimumCxxCompilerStandard)
"#;

const ANDROID_PREAMBLE: &str = "  # Choose between Android NDK Toolchain and CMake Android Toolchain
  set(cdep_supports_compiler_features TRUE)
  if(DEFINED CMAKE_ANDROID_STL_TYPE)
    set(cdep_determined_android_runtime ${CMAKE_ANDROID_STL_TYPE})
    set(cdep_determined_android_abi ${CMAKE_ANDROID_ARCH_ABI})
  else()
    set(cdep_determined_android_runtime ${ANDROID_STL})
    set(cdep_determined_android_abi ${ANDROID_ABI})
    set(cdep_supports_compiler_features FALSE)
  endif()

";

pub struct CMakeGenerator<'a> {
    environment: &'a GeneratorEnvironment,
}

impl<'a> CMakeGenerator<'a> {
    pub fn new(environment: &'a GeneratorEnvironment) -> Self {
        CMakeGenerator { environment }
    }

    pub fn configuration_file(&self) -> PathBuf {
        self.environment.modules_folder.join(CONFIG_FILE_NAME)
    }

    /// Lower a copy of `ast` and render the whole configuration file.
    pub fn create(&self, ast: &Ast) -> Result<String, GenerateError> {
        let ast = lower::fold_joined_paths(ast.clone());
        let ast = lower::lower_cxx_standard(ast);
        require_lowered(&ast)?;

        let table = ast
            .table()
            .ok_or_else(|| GenerateError::unsupported("a tree without a function table"))?;
        let globals = *ast
            .globals()
            .ok_or_else(|| GenerateError::unsupported("a tree without globals"))?;

        let mut emitter = Emitter {
            environment: self.environment,
            arena: &ast.arena,
            globals,
            out: String::new(),
            indent: 0,
            coordinate: Coordinate::empty(),
        };
        emitter.push("# GENERATED FILE. DO NOT EDIT.\n");
        emitter.push(LIBRARY_FUNCTIONS);
        for id in table.find_functions.values() {
            let find = ast
                .arena
                .find_module(*id)
                .ok_or_else(|| GenerateError::unsupported("a find function that is not a find-module"))?;
            emitter.find_module(find)?;
        }

        emitter.push("\nfunction(add_all_cdep_dependencies target)\n");
        for coordinate in table.find_functions.keys() {
            let function = add_dependency_function_name(*coordinate);
            emitter.push(&format!("  {}(${{target}})\n", function));
        }
        emitter.push("endfunction(add_all_cdep_dependencies)\n");

        debug!(
            "generated {} bytes of CMake for {} modules",
            emitter.out.len(),
            table.find_functions.len()
        );
        Ok(emitter.out)
    }

    pub fn generate(&self, ast: &Ast) -> Result<GeneratedFile, GenerateError> {
        Ok(GeneratedFile::new(self.configuration_file(), self.create(ast)?))
    }
}

/// `ZLIB` for `com.github.jomof:zlib:1.2.11`.
fn upper_artifact_id(coordinate: Coordinate) -> String {
    coordinate.artifact_id().to_uppercase().replace(['-', '/'], "_")
}

struct Emitter<'a> {
    environment: &'a GeneratorEnvironment,
    arena: &'a Arena,
    globals: GlobalEnv,
    out: String,
    indent: usize,
    coordinate: Coordinate,
}

impl<'a> Emitter<'a> {
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn pad(&self) -> String {
        "  ".repeat(self.indent)
    }

    fn find_module(&mut self, find: &FindModule) -> Result<(), GenerateError> {
        let coordinate = find.coordinate;
        self.coordinate = coordinate;
        let upper = upper_artifact_id(coordinate);
        let function = add_dependency_function_name(coordinate);
        let exploded = script_path(&self.environment.exploded_folder);

        self.push("\n###\n");
        self.push(&format!("### Add dependency for CDep module: {}\n", coordinate));
        self.push("###\n");
        self.push(&format!("if({upper}_CDEP_COORDINATE)\n"));
        self.push(&format!(
            "  message(FATAL_ERROR \"CDep module '${{{upper}_CDEP_COORDINATE}}' was already defined\")\n"
        ));
        self.push(&format!("endif({upper}_CDEP_COORDINATE)\n"));
        self.push(&format!("set({upper}_CDEP_COORDINATE \"{coordinate}\")\n"));
        if let (Some(header), Some(include)) = (&find.header_archive, &find.include) {
            self.push(&format!(
                "set({}_ROOT \"{}/{}/{}/{}/{}/{}\")\n",
                upper,
                exploded,
                coordinate.group_id(),
                coordinate.artifact_id(),
                coordinate.version(),
                header,
                include
            ));
        }
        self.push(&format!("function({} target)\n", function));
        self.push(ANDROID_PREAMBLE);
        self.push(&format!("  set(cdep_exploded_root \"{}\")\n", exploded));
        self.indent = 1;
        self.statement(find.body)?;
        self.indent = 0;
        self.push(&format!("endfunction({})\n", function));
        Ok(())
    }

    fn statement(&mut self, id: ExprId) -> Result<(), GenerateError> {
        let arena = self.arena;
        match arena.get(id) {
            Expression::AssignmentBlock { assignments, body } => {
                self.push("\n");
                for assignment in assignments {
                    self.define(*assignment)?;
                }
                self.statement(*body)
            }
            Expression::Assignment { .. } => self.define(id),
            Expression::IfSwitch {
                conditions,
                branches,
                otherwise,
            } => self.if_switch(conditions, branches, *otherwise),
            Expression::MultiStatement(statements) => {
                for statement in statements {
                    self.statement(*statement)?;
                }
                Ok(())
            }
            Expression::Module {
                archive,
                dependencies,
            } => {
                let pad = self.pad();
                for dependency in dependencies {
                    let function = add_dependency_function_name(*dependency);
                    self.push(&format!("\n{}{}(${{target}})", pad, function));
                }
                self.push("\n");
                self.statement(*archive)
            }
            Expression::ModuleArchive(archive) => self.archive(archive),
            Expression::Abort { message, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.message_argument(*arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let message = safe_format(message, &args).replace('"', "\\\"");
                let pad = self.pad();
                self.push(&format!("\n{}message(FATAL_ERROR \"{}\")\n", pad, message));
                Ok(())
            }
            Expression::Nop => {
                self.push("\n");
                Ok(())
            }
            Expression::InvokeBuiltin {
                function: Builtin::RequiresCompilerFeatures,
                args,
            } => {
                let [features] = args.as_slice() else {
                    return Err(GenerateError::unsupported("requiresCompilerFeatures arity"));
                };
                let features = self.condition(*features)?;
                let pad = self.pad();
                self.push(&format!(
                    "\n{}target_compile_features(${{target}} PRIVATE {})\n",
                    pad, features
                ));
                Ok(())
            }
            Expression::InvokeBuiltin {
                function: Builtin::RequireMinimumCxxCompilerStandard,
                args,
            } => {
                let [level] = args.as_slice() else {
                    return Err(GenerateError::unsupported("requireMinimumCxxCompilerStandard arity"));
                };
                let level = self.condition(*level)?;
                let pad = self.pad();
                self.push(&format!(
                    "\n{}cdepRequireMinimumCxxCompilerStandard(${{target}} {})\n",
                    pad, level
                ));
                Ok(())
            }
            Expression::Example { .. } | Expression::GlobalEnv(_) => Ok(()),
            other => Err(GenerateError::unsupported(format!("{} as a statement", other.kind()))),
        }
    }

    fn if_switch(
        &mut self,
        conditions: &[ExprId],
        branches: &[ExprId],
        otherwise: ExprId,
    ) -> Result<(), GenerateError> {
        if conditions.is_empty() {
            return self.statement(otherwise);
        }
        let pad = self.pad();
        self.push("\n");
        self.push(&pad);
        for (i, (condition, branch)) in conditions.iter().zip(branches).enumerate() {
            let condition = self.condition(*condition)?;
            self.push(&format!("if({})", condition));
            self.indent += 1;
            self.statement(*branch)?;
            self.indent -= 1;
            if i + 1 != conditions.len() {
                self.push(&format!("{}else", pad));
            }
        }
        if !matches!(self.arena.get(otherwise), Expression::Nop) {
            self.push(&format!("{}else()", pad));
            self.indent += 1;
            self.statement(otherwise)?;
            self.indent -= 1;
        }
        self.push(&format!("{}endif()\n", pad));
        Ok(())
    }

    /// Bind one assignment with `set`, `string` or `get_filename_component`.
    fn define(&mut self, id: ExprId) -> Result<(), GenerateError> {
        let arena = self.arena;
        let Expression::Assignment { name, value } = arena.get(id) else {
            return Err(GenerateError::unsupported(format!(
                "{} in an assignment list",
                arena.get(id).kind()
            )));
        };
        let line = match arena.get(*value) {
            Expression::Constant(constant) => format!("set({} \"{}\")", name, constant),
            Expression::Parameter { .. } | Expression::AssignmentReference { .. } => {
                format!("set({} \"{}\")", name, self.argument(*value)?)
            }
            Expression::InvokeBuiltin { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.argument(*arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match (function, values.as_slice()) {
                    (Builtin::FileGetName, [path]) => {
                        format!("get_filename_component({} {} NAME)", name, path)
                    }
                    (Builtin::StringLastIndexOf, [value, needle]) => {
                        format!("string(FIND {} {} {} REVERSE)", value, needle, name)
                    }
                    (Builtin::StringSubstring, [value, begin, end]) => {
                        // CMake takes a length where the tree holds an end index.
                        let constants = (self.integer_constant(args[1]), self.integer_constant(args[2]));
                        match constants {
                            (Some(0), _) => {
                                format!("string(SUBSTRING {} 0 {} {})", value, end, name)
                            }
                            (Some(from), Some(to)) => {
                                format!("string(SUBSTRING {} {} {} {})", value, from, to - from, name)
                            }
                            _ => format!(
                                "math(EXPR {name}_length \"{end} - {begin}\")\n{pad}string(SUBSTRING {value} {begin} ${{{name}_length}} {name})",
                                name = name,
                                end = end,
                                begin = begin,
                                value = value,
                                pad = self.pad(),
                            ),
                        }
                    }
                    _ => {
                        return Err(GenerateError::unsupported(format!(
                            "assignment from {}",
                            function.name()
                        )))
                    }
                }
            }
            other => {
                return Err(GenerateError::unsupported(format!(
                    "assignment from {}",
                    other.kind()
                )))
            }
        };
        let pad = self.pad();
        self.push(&format!("{}{}\n", pad, line));
        Ok(())
    }

    fn archive(&mut self, archive: &ModuleArchive) -> Result<(), GenerateError> {
        if !archive.requires.is_empty() {
            return Err(GenerateError::UnloweredFeatures {
                coordinate: self.coordinate,
            });
        }
        let pad = self.pad();
        let call = self.environment.fetch_archive_call(self.coordinate, archive);
        self.push(&format!("{}execute_process(COMMAND {})\n", pad, call));
        if let Some(include) = archive.include_path {
            let include = self.argument(include)?;
            self.push(&format!(
                "{}target_include_directories(${{target}} PRIVATE {})\n",
                pad, include
            ));
        }
        for library in &archive.library_paths {
            let library = self.argument(*library)?;
            self.push(&format!("{}target_link_libraries(${{target}} {})\n", pad, library));
        }
        Ok(())
    }

    /// The CMake variable standing for a global parameter.
    fn variable(&self, id: ExprId, name: &str) -> String {
        let globals = &self.globals;
        if id == globals.cxx_standard {
            "CMAKE_CXX_STANDARD".to_string()
        } else if id == globals.target_system {
            "CMAKE_SYSTEM_NAME".to_string()
        } else if id == globals.target_platform {
            "CMAKE_SYSTEM_VERSION".to_string()
        } else {
            name.to_string()
        }
    }

    /// A value in command-argument position: variables are expanded.
    fn argument(&self, id: ExprId) -> Result<String, GenerateError> {
        match self.arena.get(id) {
            Expression::Constant(Constant::String(value)) => Ok(format!("\"{}\"", value)),
            Expression::Constant(constant) => Ok(constant.to_string()),
            Expression::Parameter { .. } if id == self.globals.none_runtime => Ok("none".to_string()),
            Expression::Parameter { name } => Ok(format!("${{{}}}", self.variable(id, name))),
            Expression::AssignmentReference { assignment } => {
                let name = self
                    .arena
                    .assignment_name(*assignment)
                    .ok_or_else(|| GenerateError::unsupported("a reference to a non-assignment"))?;
                Ok(format!("${{{}}}", name))
            }
            Expression::Assignment { name, .. } => Ok(format!("${{{}}}", name)),
            other => Err(GenerateError::unsupported(format!("{} as an argument", other.kind()))),
        }
    }

    fn integer_constant(&self, id: ExprId) -> Option<i64> {
        match self.arena.get(id) {
            Expression::Constant(Constant::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    fn message_argument(&self, id: ExprId) -> Result<String, GenerateError> {
        match self.arena.get(id) {
            Expression::Constant(constant) => Ok(constant.to_string()),
            _ => self.argument(id),
        }
    }

    /// A value inside `if(...)`: variables are named, not expanded.
    fn condition(&self, id: ExprId) -> Result<String, GenerateError> {
        match self.arena.get(id) {
            Expression::Constant(Constant::String(value)) => Ok(format!("\"{}\"", value)),
            Expression::Constant(Constant::Boolean(value)) => {
                Ok(if *value { "TRUE" } else { "FALSE" }.to_string())
            }
            Expression::Constant(constant) => Ok(constant.to_string()),
            Expression::Parameter { .. } if id == self.globals.none_runtime => {
                Ok("\"none\"".to_string())
            }
            Expression::Parameter { name } => Ok(self.variable(id, name)),
            Expression::AssignmentReference { assignment } => self
                .arena
                .assignment_name(*assignment)
                .map(str::to_string)
                .ok_or_else(|| GenerateError::unsupported("a reference to a non-assignment")),
            Expression::Assignment { name, .. } => Ok(name.clone()),
            Expression::Array(elements) => Ok(elements
                .iter()
                .map(|element| self.condition(*element))
                .collect::<Result<Vec<_>, _>>()?
                .join(" ")),
            Expression::InvokeBuiltin { function, args } => self.predicate(*function, args),
            other => Err(GenerateError::unsupported(format!("{} in a condition", other.kind()))),
        }
    }

    fn predicate(&self, function: Builtin, args: &[ExprId]) -> Result<String, GenerateError> {
        let values = args
            .iter()
            .map(|arg| self.condition(*arg))
            .collect::<Result<Vec<_>, _>>()?;
        let rendered = match (function, values.as_slice()) {
            (Builtin::StringStartsWith, [value, prefix]) => {
                format!("{} MATCHES \"^{}.*\"", value, prefix.trim_matches('"'))
            }
            (Builtin::IntegerGte, [left, right]) => match self.arena.get(args[1]) {
                Expression::Constant(Constant::Integer(level)) => {
                    format!("{} GREATER {}", left, level - 1)
                }
                _ => format!("NOT {} LESS {}", left, right),
            },
            (Builtin::StringEquals | Builtin::ArrayHasOnlyElement, [left, right]) => {
                format!("{} STREQUAL {}", left, right)
            }
            (Builtin::Not, [value]) => format!("NOT {}", value),
            (Builtin::Or, [left, right]) => format!("{} OR {}", left, right),
            (Builtin::SupportsCompilerFeatures, []) => "cdep_supports_compiler_features".to_string(),
            _ => {
                return Err(GenerateError::unsupported(format!(
                    "{} in a condition",
                    function.name()
                )))
            }
        };
        Ok(rendered)
    }
}
