//! Tests for the memoized dependency resolver.

use tagane::config_values::LibFile;
use tagane::resolved::ResolvedTargetData;
use tagane::source_file::SourceDir;
use tagane::target::OutputType;
use tagane::target_pair::TargetPublicPair;
use test_support::TestGraph;

/// Libs and lib dirs are inherited across static-library boundaries but
/// not across executables or shared libraries.
#[test]
fn lib_inheritance() {
    let mut setup = TestGraph::new();

    let lib = LibFile::new("foo");
    let libdir = SourceDir::new("/foo_dir/");
    let z = setup.add_target("//foo:z", OutputType::StaticLibrary);
    setup.target_mut(z).config_values.libs.push(lib);
    setup.target_mut(z).config_values.lib_dirs.push(libdir);

    let second_lib = LibFile::new("bar");
    let second_libdir = SourceDir::new("/bar_dir/");
    let shared = setup.add_target("//foo:shared", OutputType::SharedLibrary);
    setup.target_mut(shared).config_values.libs.push(second_lib);
    setup
        .target_mut(shared)
        .config_values
        .lib_dirs
        .push(second_libdir);
    setup.target_mut(shared).private_deps.push(z);

    let exec = setup.add_target("//foo:exec", OutputType::Executable);
    setup.target_mut(exec).private_deps.push(shared);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let z_info = resolved.lib_info(z);
    assert_eq!(z_info.all_libs, &[lib]);
    assert_eq!(z_info.all_lib_dirs, &[libdir]);

    // The shared library's own values come before the inherited ones.
    let shared_info = resolved.lib_info(shared);
    assert_eq!(shared_info.all_libs, &[second_lib, lib]);
    assert_eq!(shared_info.all_lib_dirs, &[second_libdir, libdir]);

    // The executable gets nothing through the shared library.
    let exec_info = resolved.lib_info(exec);
    assert!(exec_info.all_libs.is_empty());
    assert!(exec_info.all_lib_dirs.is_empty());
}

#[test]
fn framework_inheritance() {
    let mut setup = TestGraph::new();

    let framework = "Foo.framework".to_owned();
    let framework_dir = SourceDir::new("//out/foo/");
    let z = setup.add_target("//foo:z", OutputType::StaticLibrary);
    setup
        .target_mut(z)
        .config_values
        .frameworks
        .push(framework.clone());
    setup
        .target_mut(z)
        .config_values
        .framework_dirs
        .push(framework_dir);

    let second_framework = "Bar.framework".to_owned();
    let second_framework_dir = SourceDir::new("//out/bar/");
    let shared = setup.add_target("//foo:shared", OutputType::SharedLibrary);
    setup
        .target_mut(shared)
        .config_values
        .frameworks
        .push(second_framework.clone());
    setup
        .target_mut(shared)
        .config_values
        .framework_dirs
        .push(second_framework_dir);
    setup.target_mut(shared).private_deps.push(z);

    let exec = setup.add_target("//foo:exec", OutputType::Executable);
    setup.target_mut(exec).private_deps.push(shared);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let info = resolved.framework_info(z);
    assert_eq!(info.all_frameworks, &[framework.clone()]);
    assert_eq!(info.all_framework_dirs, &[framework_dir]);

    let shared_info = resolved.framework_info(shared);
    assert_eq!(shared_info.all_frameworks, &[second_framework, framework]);
    assert_eq!(
        shared_info.all_framework_dirs,
        &[second_framework_dir, framework_dir]
    );

    let exec_info = resolved.framework_info(exec);
    assert!(exec_info.all_frameworks.is_empty());
    assert!(exec_info.all_framework_dirs.is_empty());
}

/// Chain A (executable) -> B (shared lib) -> C (static lib) -> D (source
/// set), all private.
#[test]
fn inherited_libraries_stop_at_shared_library() {
    let mut setup = TestGraph::new();
    let a = setup.add_target("//foo:a", OutputType::Executable);
    let b = setup.add_target("//foo:b", OutputType::SharedLibrary);
    let c = setup.add_target("//foo:c", OutputType::StaticLibrary);
    let d = setup.add_target("//foo:d", OutputType::SourceSet);
    setup.target_mut(c).config_values.libs.push(LibFile::new("foo"));
    setup
        .target_mut(c)
        .config_values
        .lib_dirs
        .push(SourceDir::new("/foo_dir/"));
    setup.target_mut(a).private_deps.push(b);
    setup.target_mut(b).private_deps.push(c);
    setup.target_mut(c).private_deps.push(d);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let c_inherited: Vec<_> = resolved
        .inherited_libraries(c)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(c_inherited, vec![d]);

    let b_inherited: Vec<_> = resolved
        .inherited_libraries(b)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(b_inherited, vec![c, d]);

    // The shared library swallows the static library and source set.
    let a_inherited: Vec<_> = resolved
        .inherited_libraries(a)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(a_inherited, vec![b]);
    assert!(resolved
        .inherited_libraries(a)
        .iter()
        .all(|pair| !pair.is_public()));

    // Libraries do not leak past the shared-library boundary either.
    assert!(resolved.all_libs(a).is_empty());
    assert!(resolved.all_lib_dirs(a).is_empty());
    assert_eq!(resolved.all_libs(c), &[LibFile::new("foo")]);
    assert_eq!(resolved.all_lib_dirs(c), &[SourceDir::new("/foo_dir/")]);
}

/// An action breaks inherited-library propagation entirely.
#[test]
fn no_action_dep_propagation() {
    let mut setup = TestGraph::new();
    let a = setup.add_target("//foo:a", OutputType::Executable);
    let b = setup.add_target("//foo:b", OutputType::Action);
    let c = setup.add_target("//foo:c", OutputType::SourceSet);
    setup.target_mut(a).private_deps.push(b);
    setup.target_mut(b).private_deps.push(c);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);
    assert!(resolved.inherited_libraries(a).is_empty());
}

/// A (executable) -> B (complete static lib) -> C (source set), public:
/// the source set is linked into B, but its libs still reach A.
#[test]
fn inherit_complete_static_lib() {
    let mut setup = TestGraph::new();
    let a = setup.add_target("//foo:a", OutputType::Executable);
    let b = setup.add_target("//foo:b", OutputType::StaticLibrary);
    setup.target_mut(b).complete_static_lib = true;
    let c = setup.add_target("//foo:c", OutputType::SourceSet);
    let lib = LibFile::new("foo");
    let lib_dir = SourceDir::new("/foo_dir/");
    setup.target_mut(c).config_values.libs.push(lib);
    setup.target_mut(c).config_values.lib_dirs.push(lib_dir);
    setup.target_mut(a).public_deps.push(b);
    setup.target_mut(b).public_deps.push(c);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let b_inherited: Vec<_> = resolved
        .inherited_libraries(b)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(b_inherited, vec![c]);

    let a_inherited: Vec<_> = resolved
        .inherited_libraries(a)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(a_inherited, vec![b]);
    assert!(resolved.inherited_libraries(a)[0].is_public());

    let a_info = resolved.lib_info(a);
    assert_eq!(a_info.all_libs, &[lib]);
    assert_eq!(a_info.all_lib_dirs, &[lib_dir]);
}

/// A complete static lib links in a plain static lib; consumers do not
/// inherit it.
#[test]
fn complete_static_lib_swallows_static_lib_deps() {
    let mut setup = TestGraph::new();
    let a = setup.add_target("//foo:a", OutputType::Executable);
    let b = setup.add_target("//foo:b", OutputType::StaticLibrary);
    setup.target_mut(b).complete_static_lib = true;
    let c = setup.add_target("//foo:c", OutputType::StaticLibrary);
    setup.target_mut(a).public_deps.push(b);
    setup.target_mut(b).public_deps.push(c);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let b_inherited: Vec<_> = resolved
        .inherited_libraries(b)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(b_inherited, vec![c]);

    let a_inherited: Vec<_> = resolved
        .inherited_libraries(a)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(a_inherited, vec![b]);
}

/// A complete static lib forwards an inner complete static lib, which is
/// final and therefore linked by the outer consumer.
#[test]
fn complete_static_lib_forwards_final_deps() {
    let mut setup = TestGraph::new();
    let a = setup.add_target("//foo:a", OutputType::Executable);
    let b = setup.add_target("//foo:b", OutputType::StaticLibrary);
    setup.target_mut(b).complete_static_lib = true;
    let c = setup.add_target("//foo:c", OutputType::StaticLibrary);
    setup.target_mut(c).complete_static_lib = true;
    setup.target_mut(a).private_deps.push(b);
    setup.target_mut(b).private_deps.push(c);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let a_inherited: Vec<_> = resolved
        .inherited_libraries(a)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(a_inherited, vec![b, c]);
}

/// Public shared-library deps cross the boundary; private ones stop.
#[test]
fn shared_library_boundary_publicness() {
    let mut setup = TestGraph::new();
    let exec = setup.add_target("//foo:exec", OutputType::Executable);
    let intermediate = setup.add_target("//foo:intermediate", OutputType::SharedLibrary);
    let public_final = setup.add_target("//foo:public_final", OutputType::SharedLibrary);
    let private_final = setup.add_target("//foo:private_final", OutputType::SharedLibrary);
    setup.target_mut(exec).private_deps.push(intermediate);
    setup.target_mut(intermediate).public_deps.push(public_final);
    setup
        .target_mut(intermediate)
        .private_deps
        .push(private_final);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let exec_inherited: Vec<_> = resolved
        .inherited_libraries(exec)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(exec_inherited, vec![intermediate, public_final]);
    assert!(!exec_inherited.contains(&private_final));
}

#[test]
fn hard_deps_collect_actions_and_stop_at_headerless_binaries() {
    let mut setup = TestGraph::new();
    let exec = setup.add_target("//foo:exec", OutputType::Executable);
    let lib = setup.add_target("//foo:lib", OutputType::StaticLibrary);
    let action = setup.add_target("//foo:gen", OutputType::Action);
    let opaque = setup.add_target("//foo:opaque", OutputType::StaticLibrary);
    let hidden_action = setup.add_target("//foo:hidden", OutputType::Action);

    setup.target_mut(exec).private_deps.push(lib);
    setup.target_mut(lib).private_deps.push(action);
    // A binary dep with no public headers does not forward its hard deps.
    setup.target_mut(exec).private_deps.push(opaque);
    setup.target_mut(opaque).all_headers_public = false;
    setup.target_mut(opaque).private_deps.push(hidden_action);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let lib_hard = resolved.recursive_hard_deps(lib).to_vec();
    assert_eq!(lib_hard, vec![action]);

    let exec_hard = resolved.recursive_hard_deps(exec).to_vec();
    assert!(exec_hard.contains(&action));
    assert!(!exec_hard.contains(&hidden_action));
}

#[test]
fn empty_linked_deps_produce_empty_answers() {
    let mut setup = TestGraph::new();
    let leaf = setup.add_target("//foo:leaf", OutputType::Executable);
    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);
    assert!(resolved.inherited_libraries(leaf).is_empty());
    assert!(resolved.recursive_hard_deps(leaf).is_empty());
}

/// Public-flag promotion: a target reached privately first and publicly
/// later ends up public, without changing its position.
#[test]
fn public_flag_promotion_through_diamond() {
    let mut setup = TestGraph::new();
    let top = setup.add_target("//foo:top", OutputType::StaticLibrary);
    let left = setup.add_target("//foo:left", OutputType::SourceSet);
    let right = setup.add_target("//foo:right", OutputType::SourceSet);
    let bottom = setup.add_target("//foo:bottom", OutputType::StaticLibrary);

    // left reaches bottom privately, right reaches it publicly.
    setup.target_mut(top).public_deps.push(left);
    setup.target_mut(top).public_deps.push(right);
    setup.target_mut(left).private_deps.push(bottom);
    setup.target_mut(right).public_deps.push(bottom);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let inherited = resolved.inherited_libraries(top);
    let bottom_pair = inherited
        .iter()
        .find(|pair| pair.target() == bottom)
        .expect("bottom inherited");
    assert!(bottom_pair.is_public());
    // First-reached position is kept: left, bottom (via left), right.
    let order: Vec<_> = inherited.iter().copied().map(TargetPublicPair::target).collect();
    assert_eq!(order, vec![left, bottom, right]);
}

#[test]
fn rust_proc_macro_deps_do_not_escape() {
    let mut setup = TestGraph::new();
    let exec = setup.add_rust_target("//foo:exec", OutputType::Executable, "exec");
    let macro_lib = setup.add_rust_target("//bar:mymacro", OutputType::RustProcMacro, "mymacro");
    let macro_dep = setup.add_rust_target("//bar:inner", OutputType::RustLibrary, "inner");
    setup.target_mut(macro_lib).public_deps.push(macro_dep);
    setup.target_mut(exec).private_deps.push(macro_lib);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let inherited: Vec<_> = resolved
        .rust_transitive_inherited_libs(exec)
        .iter()
        .copied().map(TargetPublicPair::target)
        .collect();
    assert_eq!(inherited, vec![macro_lib]);
    assert!(!inherited.contains(&macro_dep));

    // Nor do proc macros appear in plain inherited libraries of a
    // transitively depending target.
    assert!(resolved.inherited_libraries(exec).is_empty());
}

#[test]
fn rust_inherited_is_all_public_while_inheritable_is_gated() {
    let mut setup = TestGraph::new();
    let top = setup.add_rust_target("//foo:top", OutputType::RustLibrary, "top");
    let private_dep = setup.add_rust_target("//foo:private", OutputType::RustLibrary, "private");
    setup.target_mut(top).private_deps.push(private_dep);

    let graph = setup.into_graph();
    let mut resolved = ResolvedTargetData::new(&graph);

    let inherited = resolved.rust_transitive_inherited_libs(top).to_vec();
    assert_eq!(inherited.len(), 1);
    assert!(inherited[0].is_public());

    let inheritable = resolved.rust_inheritable_libs(top).to_vec();
    assert_eq!(inheritable.len(), 1);
    assert!(!inheritable[0].is_public());
}
