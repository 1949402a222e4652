pub const EXISTS: &'static str = r#"tell application "Reminders"
    set myList to list "{{list}}"
    set matchingReminders to (reminders of myList whose name is "{{title}}")
    if (count of matchingReminders) > 0 then
        return "true"
    else
        return "false"
    end if
end tell
"#;

pub const CREATE: &'static str = r#"tell application "Reminders"
    tell list "{{list}}"
        make new reminder with properties {name:"{{title}}", body:"{{body}}"}
    end tell
end tell
"#;
