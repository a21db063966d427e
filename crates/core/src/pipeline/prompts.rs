//! Prompt templates for the summarizer.

const BRANCHES: &str = "\
Assume that you are a branch analyzer for GitHub. You have to take in a list of branches \
and output 2-3 sentences ONLY about the branches and branch names. Be as to the point as \
possible, be crisp and only 2-3 sentences. Enclose the comments in double quotes. Do not \
output anything other than the comments. Also comment on the naming convention (including \
other features of the branches, not only names). Detect if the names are too simple or if \
there are not enough branches. The branches are:

";

const DIRECTORY: &str = "\
Assume that you are a GitHub repository analyzer. You have to take in a directory \
structure, one `-- path sha` line per entry with tabs marking depth, and output 2-3 \
sentences. Be as to the point as possible, be crisp and only 2-3 sentences. Enclose the \
comments in double quotes. Do not output anything other than the comments. Comment on file \
and folder naming conventions, code modularization, etc. Detect if the structure is too \
simple or not ordered. The directory structure is:

";

const FILE_SELECTION_HEAD: &str = "\
You are a Project Manager. You will be provided with the directory tree of a project, where \
internal nodes are folders and leaf nodes are files. Choose strictly at most ";

const FILE_SELECTION_TAIL: &str = " files (you can choose fewer) which will be used to \
analyse the code quality and derive the description of the project. Ignore bulk folders \
like node_modules, .git, etc. Only select coding files; ignore spreadsheets, images, \
videos and documents. Do not include any explanations, only provide an RFC8259 compliant \
JSON response following this format without deviation:

[
    {
        \"file_name\": <file_name>,
        \"sha_hash\": <sha_hash>
    }
]

The directory tree is:

";

const CODE_QUALITY: &str = "\
Assume you are a code quality analyzer. You will be provided with the relevant code files \
of a project, concatenated. You are tasked with two things.

First analyse all the files and come up with a description of the code quality. Be as to \
the point as possible, be crisp and strictly under 4-5 sentences.

Second assign a numerical score out of 100 to the code of the project. The score must be \
strictly a single integer.

Output only a JSON object with two keys, description and score, and nothing else:

{
    \"description\": <description>,
    \"score\": <score>
}

The concatenated files are given below:

";

const DESCRIPTION: &str = "\
Assume that you are a repository analyzer for GitHub. You have to take in some code files \
from the repository concatenated together and output 2-3 sentences ONLY describing what \
the project is about. Be as to the point as possible, be crisp and only 2-3 sentences. \
Enclose the comments in double quotes. Do not output anything other than the comments. \
The code is given below:

";

const COMMITS_HEAD: &str = "\
You are a Project Manager. You will be provided with the description of a project and the \
list of its commits in order from the start of the project until now.

Analyse the whole commit list against the project description and come up with a \
description of the quality of the commits. Do not output anything other than the \
description. Keep it to the point, crisp and strictly under 2-3 sentences. Enclose the \
description in double quotes.

Project description:
";

const README_HEAD: &str = "\
You are a Project Manager. You will be provided with the description of a project and the \
content of its readme file.

Analyse the readme file against the project description and come up with a description of \
the quality of the readme file. Do not output anything other than the description. Keep it \
to the point, crisp and strictly under 1-2 sentences. Enclose the description in double \
quotes.

Project description:
";

pub fn branches(names: &[String]) -> String {
    format!("{BRANCHES}{names:?}")
}

pub fn directory(tree: &str) -> String {
    format!("{DIRECTORY}{tree}")
}

pub fn file_selection(tree: &str, max_files: usize) -> String {
    format!("{FILE_SELECTION_HEAD}{max_files}{FILE_SELECTION_TAIL}{tree}")
}

pub fn code_quality(file_contents: &str) -> String {
    format!("{CODE_QUALITY}{file_contents}")
}

pub fn description(file_contents: &str) -> String {
    format!("{DESCRIPTION}{file_contents}")
}

pub fn commit_history(project_description: &str, commits: &str) -> String {
    format!("{COMMITS_HEAD}{project_description}\n\nList of commits:\n{commits}")
}

pub fn readme(project_description: &str, readme: &str) -> String {
    format!("{README_HEAD}{project_description}\n\nReadme content:\n{readme}")
}
