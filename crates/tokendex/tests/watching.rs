//! Background consistency with the filesystem.

mod common;

use std::fs;

use tokendex::{Indexer, Recursive};

use common::{eventually, scratch, settle, write};

#[test]
fn modifications_are_caught() {
    let (_dir, root) = scratch();
    let file = root.join("modified");
    write(&file, "UNMODIFIED\n");

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&file, Recursive::No).expect("add");
    assert!(indexer.search("UNMODIFIED").contains(&file));
    assert!(!indexer.search("MODIFY").contains(&file));

    write(&file, "MODIFY\n");
    assert!(eventually(|| {
        indexer.search("MODIFY").contains(&file) && !indexer.search("UNMODIFIED").contains(&file)
    }));
}

#[test]
fn creations_in_a_recursive_directory_are_caught() {
    let (_dir, root) = scratch();

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&root, Recursive::Yes).expect("add root");

    let file = root.join("created");
    write(&file, "CREATE\n");
    assert!(eventually(|| indexer.search("CREATE").contains(&file)));

    let subdir = root.join("subdir");
    fs::create_dir(&subdir).expect("mkdir");
    let inner = subdir.join("inner");
    write(&inner, "CREATE\n");
    assert!(eventually(|| indexer.search("CREATE").contains(&inner)));
}

#[test]
fn new_files_in_a_non_recursive_directory_are_caught() {
    let (_dir, root) = scratch();

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&root, Recursive::No).expect("add root");

    let file = root.join("created");
    write(&file, "CREATE\n");
    assert!(eventually(|| indexer.search("CREATE").contains(&file)));

    // recursion off: a new subdirectory's contents stay out
    let subdir = root.join("subdir");
    fs::create_dir(&subdir).expect("mkdir");
    let inner = subdir.join("inner");
    write(&inner, "CREATE\n");
    assert!(eventually(|| indexer.search("CREATE").contains(&file)));
    assert!(!indexer.search("CREATE").contains(&inner));
}

#[test]
fn deletions_are_caught() {
    let (_dir, root) = scratch();
    let file = root.join("deleted");
    write(&file, "DELETE\n");

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&root, Recursive::No).expect("add root");
    assert!(indexer.search("DELETE").contains(&file));

    fs::remove_file(&file).expect("remove");
    assert!(eventually(|| !indexer.search("DELETE").contains(&file)));
}

#[test]
fn deleted_and_recreated_files_are_caught() {
    let (_dir, root) = scratch();
    let file = root.join("recreated");
    write(&file, "\nDELETE\n");

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&file, Recursive::No).expect("add");
    assert!(indexer.search("DELETE").contains(&file));

    fs::remove_file(&file).expect("remove");
    assert!(eventually(|| !indexer.search("DELETE").contains(&file)));
    settle();

    write(&file, "RECREATE\n");
    assert!(eventually(|| {
        indexer.search("RECREATE").contains(&file) && !indexer.search("DELETE").contains(&file)
    }));
}

#[test]
fn recreation_deeper_in_the_tree_is_caught() {
    let (_dir, root) = scratch();
    let subdir = root.join("subdir");
    fs::create_dir(&subdir).expect("mkdir");
    let file = subdir.join("file");
    write(&file, "DELETE\n");

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&file, Recursive::No).expect("add");
    assert!(indexer.search("DELETE").contains(&file));

    fs::remove_dir_all(&subdir).expect("remove tree");
    assert!(eventually(|| !indexer.search("DELETE").contains(&file)));
    settle();

    fs::create_dir(&subdir).expect("recreate dir");
    write(&file, "RECREATE\n");
    assert!(eventually(|| {
        indexer.search("RECREATE").contains(&file) && !indexer.search("DELETE").contains(&file)
    }));
}

#[test]
fn step_by_step_deletion_and_recreation_is_caught() {
    let (_dir, root) = scratch();
    let subdir = root.join("subdir");
    fs::create_dir(&subdir).expect("mkdir");
    let file = subdir.join("file");
    write(&file, "DELETE\n");

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&file, Recursive::No).expect("add");
    assert!(indexer.search("DELETE").contains(&file));

    fs::remove_file(&file).expect("remove file");
    assert!(eventually(|| !indexer.search("DELETE").contains(&file)));
    settle();

    fs::remove_dir(&subdir).expect("remove dir");
    settle();

    fs::create_dir(&subdir).expect("recreate dir");
    write(&file, "RECREATE\n");
    assert!(eventually(|| {
        indexer.search("RECREATE").contains(&file) && !indexer.search("DELETE").contains(&file)
    }));
}

#[test]
fn registration_before_creation_is_honored() {
    let (_dir, root) = scratch();
    let file = root.join("future");

    let indexer = Indexer::new().expect("indexer");
    indexer
        .add_path(root.join("never_created"), Recursive::No)
        .expect("add bogus");
    indexer.add_path(&file, Recursive::No).expect("add pending");

    write(&file, "CREATE\n");
    assert!(eventually(|| indexer.search("CREATE").contains(&file)));
}

#[test]
fn missing_ancestors_are_tracked_as_they_appear() {
    let (_dir, root) = scratch();
    let file = root.join("h").join("sub").join("file");

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&file, Recursive::No).expect("add pending");

    fs::create_dir(root.join("h")).expect("mkdir h");
    fs::create_dir(root.join("h").join("sub")).expect("mkdir sub");
    write(&file, "RECREATE\n");

    assert!(eventually(|| indexer.search("RECREATE").contains(&file)));
}

#[test]
fn pending_directories_remember_their_recursion() {
    let (_dir, root) = scratch();
    let newdir = root.join("newdir");

    let indexer = Indexer::new().expect("indexer");
    indexer.add_path(&newdir, Recursive::Yes).expect("add pending dir");

    fs::create_dir(&newdir).expect("mkdir");
    let inner_dir = newdir.join("inner");
    fs::create_dir(&inner_dir).expect("mkdir inner");
    let deep = inner_dir.join("deep");
    write(&deep, "DEEP\n");

    assert!(eventually(|| indexer.search("DEEP").contains(&deep)));
}
