// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_flat_diagram(messages: usize) -> String {
    let mut content = String::from("@startuml\nparticipant Client\nparticipant Server\n");
    for i in 0..messages {
        content.push_str(&format!("Client -> Server: request {i}\n"));
        content.push_str(&format!("Server --> Client: response {i}\n"));
    }
    content.push_str("@enduml\n");
    content
}

#[allow(dead_code)]
pub fn generate_nested_diagram(blocks: usize, depth: usize) -> String {
    let mut content = String::from("@startuml\n");
    for block in 0..blocks {
        generate_block(&mut content, block, depth, 0);
    }
    content.push_str("@enduml\n");
    content
}

#[allow(dead_code)]
fn generate_block(content: &mut String, block: usize, remaining_depth: usize, level: usize) {
    let indent = "  ".repeat(level);
    if remaining_depth == 0 {
        content.push_str(&format!("{indent}A -> B: leaf {block} at {level}\n"));
        return;
    }

    content.push_str(&format!("{indent}alt case {block} at {level}\n"));
    generate_block(content, block, remaining_depth - 1, level + 1);
    content.push_str(&format!("{indent}else other\n"));
    content.push_str(&format!("{indent}  B --> A: fallback {block} at {level}\n"));
    content.push_str(&format!("{indent}end\n"));
}

/// `text` with the `nth` message text changed, the way a user types.
#[allow(dead_code)]
pub fn edit_line(text: &str, nth: usize) -> String {
    let needle = format!("request {nth}\n");
    text.replacen(&needle, &format!("request {nth} (edited)\n"), 1)
}
