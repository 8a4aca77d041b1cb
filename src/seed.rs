// src/seed.rs

use sqlx::SqlitePool;

use crate::{error::AppError, store::subjects};

struct SeedSubject {
    key: &'static str,
    title: &'static str,
    display_order: i64,
    /// (title, seed topic), in sequence order.
    modules: &'static [(&'static str, &'static str)],
}

const CATALOG: &[SeedSubject] = &[
    SeedSubject {
        key: "cpp",
        title: "C++ Programming",
        display_order: 1,
        modules: &[
            ("Intro to C++", "History & setup, structure of a C++ program"),
            ("Variables & Types", "Primitive types, variables, constants in C++"),
            ("Control Flow", "if/else, loops, switch statements in C++"),
            ("Functions", "Function declaration, parameters, return values in C++"),
            ("Pointers", "Pointers, references, and basics of memory management in C++"),
        ],
    },
    SeedSubject {
        key: "python",
        title: "Python Programming",
        display_order: 2,
        modules: &[
            ("Python Basics", "Syntax, indentation, variables, basic data types (int, float, bool, string), operators"),
            ("Data Structures", "Lists, tuples, dictionaries, sets: creation, manipulation, and methods"),
            ("Control Flow", "Conditional statements (if/elif/else), loops (for, while), break, continue, pass"),
            ("Functions", "Defining functions, positional/keyword/default arguments, *args and **kwargs, scope (LEGB rule), lambda functions"),
            ("File Handling", "Opening, reading, writing files, file modes, context managers (with statement)"),
            ("Exception Handling", "try, except, else, finally blocks, raising exceptions"),
        ],
    },
    SeedSubject {
        key: "java",
        title: "Java Programming",
        display_order: 3,
        modules: &[
            ("Java Basics", "JVM, JDK, JRE, basic syntax, data types, variables, operators, type casting"),
            ("Control Flow", "Conditional statements (if-else, switch), loops (for, while, do-while), break, continue"),
            ("Arrays & Strings", "Declaring and initializing arrays, multi-dimensional arrays, String, StringBuilder"),
            ("Classes & Objects", "Classes, objects, constructors, the this keyword, static members, methods"),
            ("Collections Framework", "List (ArrayList, LinkedList), Set (HashSet, TreeSet), Map (HashMap, TreeMap), Iterator, Generics"),
        ],
    },
    SeedSubject {
        key: "dsa",
        title: "Data Structures & Algorithms",
        display_order: 4,
        modules: &[
            ("Algorithm Analysis", "Asymptotic notations (Big O, Big Omega, Big Theta), time and space complexity, recurrence relations"),
            ("Arrays", "Basic operations, dynamic arrays, multi-dimensional arrays, common array-based problems"),
            ("Linked Lists", "Singly, doubly and circular linked lists, insertion, deletion, traversal"),
            ("Stacks", "LIFO principle, push/pop/peek, array and linked list implementations, expression evaluation"),
            ("Queues", "FIFO principle, enqueue/dequeue, circular queues, priority queues, deques"),
            ("Trees", "Binary trees, binary search trees, insertion, deletion, search, inorder/preorder/postorder traversals"),
            ("Hashing", "Hash functions, collision resolution (chaining, open addressing), applications"),
            ("Graphs", "Adjacency matrix and list, BFS, DFS, Dijkstra, Bellman-Ford, minimum spanning trees"),
            ("Sorting Algorithms", "Bubble, selection, insertion, merge, quick, heap and counting sort"),
            ("Dynamic Programming", "Overlapping subproblems, optimal substructure, memoization vs tabulation, LCS, 0/1 knapsack"),
        ],
    },
    SeedSubject {
        key: "cn",
        title: "Computer Networks",
        display_order: 5,
        modules: &[
            ("Introduction & Layering", "Network goals, applications, topologies, layered architecture (OSI, TCP/IP)"),
            ("Physical Layer", "Transmission media, encoding, multiplexing (FDM, TDM, WDM), circuit and packet switching"),
            ("Data Link Layer", "Framing, error detection (parity, CRC), flow control (Stop-and-Wait, Sliding Window), MAC protocols, Ethernet, ARP"),
            ("Network Layer - Addressing", "IPv4 addressing, subnetting, CIDR, IPv6 addressing"),
            ("Network Layer - Routing", "Distance vector (RIP), link state (OSPF), BGP, IP, ICMP"),
            ("Transport Layer", "UDP, TCP segment structure, 3-way handshake, flow control, congestion control (AIMD, slow start)"),
            ("Application Layer", "HTTP, HTTPS, FTP, SMTP, POP3, IMAP, DNS"),
            ("Network Security", "Symmetric and asymmetric cryptography basics, firewalls, VPNs, common threats"),
        ],
    },
];

/// Inserts the built-in subjects and their modules. Subjects whose key already
/// exists are skipped, so running this on every start-up is safe.
///
/// Returns the number of subjects created.
pub async fn seed_subjects(pool: &SqlitePool) -> Result<usize, AppError> {
    let mut created = 0;

    for subject in CATALOG {
        let mut tx = pool.begin().await?;

        let Some(subject_id) = subjects::insert_subject_if_absent(
            &mut *tx,
            subject.key,
            subject.title,
            subject.display_order,
        )
        .await?
        else {
            tracing::debug!("Subject '{}' already exists. Skipping.", subject.key);
            continue;
        };

        for (position, (title, seed_topic)) in (1..).zip(subject.modules) {
            subjects::insert_module(&mut *tx, subject_id, position, title, seed_topic).await?;
        }

        tx.commit().await?;
        created += 1;
        tracing::info!(
            "Seeded subject '{}' with {} modules",
            subject.key,
            subject.modules.len()
        );
    }

    Ok(created)
}
