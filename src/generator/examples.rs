//! Example projects that consume every coordinate with an example source.

use std::path::Path;

use crate::ast::{Ast, Expression};
use crate::generator::cmake::CMakeGenerator;
use crate::generator::ndk_build::MODULE_NAME;
use crate::generator::{
    add_dependency_function_name, coordinate_folder, script_path, GenerateError, GeneratedFile,
    GeneratorEnvironment,
};

const NDK_ALL_ABIS: &str = "x86_64 x86 armeabi-v7a armeabi arm64-v8a";

/// `(coordinate, example source)` for each coordinate with an example.
fn example_sources(ast: &Ast) -> Result<Vec<(crate::core::Coordinate, &str)>, GenerateError> {
    let table = ast
        .table()
        .ok_or_else(|| GenerateError::unsupported("a tree without a function table"))?;
    table
        .examples
        .iter()
        .map(|(coordinate, id)| match ast.arena.get(*id) {
            Expression::Example { source } => Ok((*coordinate, source.as_str())),
            other => Err(GenerateError::unsupported(format!(
                "{} as an example",
                other.kind()
            ))),
        })
        .collect()
}

/// A CMake project per example plus a root `CMakeLists.txt` adding them all.
pub fn cmake_examples(
    environment: &GeneratorEnvironment,
    ast: &Ast,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let root = environment.examples_folder.join("cmake");
    let config = CMakeGenerator::new(environment).configuration_file();
    let mut files = Vec::new();
    let mut root_lists = String::from("cmake_minimum_required(VERSION 3.0.2)\n");

    for (coordinate, source) in example_sources(ast)? {
        let folder = coordinate_folder(&root, coordinate);
        let artifact = coordinate.artifact_id().replace('/', "_");
        let source_name = format!("{}.cpp", artifact);
        let lists = format!(
            "cmake_minimum_required(VERSION 3.0.2)\n\
             project({artifact}_example_project)\n\
             include(\"{config}\")\n\
             add_library({artifact}_target SHARED {source_name})\n\
             {function}({artifact}_target)\n",
            config = script_path(&config),
            function = add_dependency_function_name(coordinate),
        );
        files.push(GeneratedFile::new(folder.join(&source_name), source));
        files.push(GeneratedFile::new(folder.join("CMakeLists.txt"), lists));
        root_lists.push_str(&format!("add_subdirectory(\"{}\")\n", script_path(&folder)));
    }

    files.push(GeneratedFile::new(root.join("CMakeLists.txt"), root_lists));
    Ok(files)
}

/// An ndk-build project per example plus `jni/Android.mk` and
/// `jni/Application.mk` tying them together.
pub fn ndk_build_examples(
    environment: &GeneratorEnvironment,
    ast: &Ast,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let root = environment.examples_folder.join("ndk-build");
    let mut files = Vec::new();
    let mut root_mk = String::new();

    for (coordinate, source) in example_sources(ast)? {
        let folder = coordinate_folder(&root, coordinate);
        let artifact = coordinate.artifact_id().replace('/', "-");
        let source_name = format!("{}.cpp", artifact);
        let android_mk = format!(
            "LOCAL_PATH := $(call my-dir)\n\
             include $(CLEAR_VARS)\n\
             LOCAL_MODULE := hello-{artifact}\n\
             LOCAL_SRC_FILES += {source_name}\n\
             LOCAL_STATIC_LIBRARIES += {artifact}\n\
             LOCAL_LDLIBS += -llog -ldl -lz -lm -latomic -lGLESv1_CM -lGLESv2 -landroid\n\
             include $(BUILD_SHARED_LIBRARY)\n\
             $(call import-module, {module})\n",
            module = MODULE_NAME
        );
        let android_mk_path = folder.join("Android.mk");
        root_mk.push_str(&format!("include {}\n", script_path(&android_mk_path)));
        files.push(GeneratedFile::new(folder.join(&source_name), source));
        files.push(GeneratedFile::new(android_mk_path, android_mk));
    }

    let jni = root.join("jni");
    files.push(GeneratedFile::new(jni.join("Android.mk"), root_mk));
    files.push(GeneratedFile::new(
        jni.join("Application.mk"),
        application_mk(&environment.modules_folder),
    ));
    Ok(files)
}

fn application_mk(modules_folder: &Path) -> String {
    format!(
        "NDK_ALL_ABIS={}\n\
         APP_PLATFORM=android-21\n\
         NDK_MODULE_PATH={}/ndk-build\n\
         APP_STL=c++_static\n\
         APP_CPPFLAGS := -frtti -fexceptions\n",
        NDK_ALL_ABIS,
        script_path(modules_folder)
    )
}
